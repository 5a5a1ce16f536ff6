use vserve_backend::InferenceEngine;
use vserve_common::{Result, ServeError};

use crate::prompt::Prompt;
use crate::sampling::resolve;
use crate::schema::{CompletionRequest, CompletionResponse};

/// Runs one request through the engine: a single batched call, no retries.
pub async fn complete(engine: &dyn InferenceEngine, request: CompletionRequest) -> Result<CompletionResponse> {
    let prompt = Prompt::from_value(request.prompt)?;
    let sampling = resolve(request.parameters.as_ref(), request.max_tokens, engine.accepted_parameters())?;
    let (shape, prompts) = prompt.into_batch();
    tracing::debug!(target: "core", prompts = prompts.len(), ?sampling, "invoking engine");

    let completions = engine.generate(&prompts, &sampling).await?;
    if completions.len() != prompts.len() {
        return Err(ServeError::inference(format!(
            "engine returned {} completions for {} prompts",
            completions.len(),
            prompts.len()
        )));
    }
    Ok(CompletionResponse { completion: shape.apply(completions) })
}
