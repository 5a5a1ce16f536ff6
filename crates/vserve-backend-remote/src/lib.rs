//! Engine backed by an OpenAI-compatible completion server (vLLM, TGI in OpenAI mode, ...).

use serde::Deserialize;
use serde_json::{Map, Value};
use vserve_backend::{EngineParams, InferenceEngine, SamplingConfig};
use vserve_common::config::display_name;
use vserve_common::{Result, ServeError};

#[derive(Debug, Clone)]
pub struct RemoteEngine {
    client: reqwest::Client,
    base_url: String,
    params: EngineParams,
    /// Id the server listed for the configured model; sent with every completion request.
    served_model: String,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelCard>,
}

#[derive(Deserialize)]
struct ModelCard {
    id: String,
}

#[derive(Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    index: usize,
    text: String,
}

impl RemoteEngine {
    /// Connects to the server and checks that it serves `params.model`.
    pub async fn connect(base_url: &str, params: EngineParams) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ServeError::startup(format!("http client: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let served_model = served_model_id(&client, &base_url, &params.model).await?;
        let engine = Self { client, base_url, params, served_model };
        tracing::info!(
            target: "engine",
            model = %engine.params.model,
            served_model = %engine.served_model,
            tensor_parallel_size = engine.params.tensor_parallel_size,
            dtype = %engine.params.dtype,
            gpu_memory_utilization = engine.params.gpu_memory_utilization,
            trust_remote_code = engine.params.trust_remote_code,
            "connected to remote engine at {}", engine.base_url
        );
        Ok(engine)
    }

    pub fn params(&self) -> &EngineParams { &self.params }

    pub fn served_model(&self) -> &str { &self.served_model }

    fn request_body(&self, prompts: &[String], sampling: &SamplingConfig) -> Result<Value> {
        let mut body = Map::new();
        for (key, value) in sampling.iter() {
            let value = serde_json::to_value(value).map_err(|e| ServeError::inference(e.to_string()))?;
            body.insert(key.clone(), value);
        }
        body.insert("model".into(), Value::String(self.served_model.clone()));
        body.insert("prompt".into(), Value::from(prompts.to_vec()));
        Ok(Value::Object(body))
    }
}

/// Returns the id under which the server lists `wanted`. An exact match wins;
/// otherwise ids are compared by their last path segment.
async fn served_model_id(client: &reqwest::Client, base_url: &str, wanted: &str) -> Result<String> {
    let url = format!("{base_url}/v1/models");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| ServeError::startup(format!("engine unreachable at {url}: {e}")))?;
    if !resp.status().is_success() {
        return Err(ServeError::startup(format!("{url} returned {}", resp.status())));
    }
    let list: ModelList = resp
        .json()
        .await
        .map_err(|e| ServeError::startup(format!("malformed model list: {e}")))?;
    let short = display_name(wanted);
    list.data
        .iter()
        .find(|m| m.id == wanted)
        .or_else(|| list.data.iter().find(|m| display_name(&m.id) == short))
        .map(|m| m.id.clone())
        .ok_or_else(|| {
            let served: Vec<&str> = list.data.iter().map(|m| m.id.as_str()).collect();
            ServeError::startup(format!("engine does not serve {wanted}; available: {served:?}"))
        })
}

#[async_trait::async_trait]
impl InferenceEngine for RemoteEngine {
    async fn generate(&self, prompts: &[String], sampling: &SamplingConfig) -> Result<Vec<String>> {
        let url = format!("{}/v1/completions", self.base_url);
        let body = self.request_body(prompts, sampling)?;
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServeError::inference(format!("request to {url} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ServeError::inference(format!("engine returned {status}: {detail}")));
        }
        let parsed: CompletionsResponse = resp
            .json()
            .await
            .map_err(|e| ServeError::inference(format!("malformed engine response: {e}")))?;
        let mut choices = parsed.choices;
        if choices.len() != prompts.len() {
            return Err(ServeError::inference(format!(
                "engine returned {} completions for {} prompts",
                choices.len(),
                prompts.len()
            )));
        }
        choices.sort_by_key(|c| c.index);
        Ok(choices.into_iter().map(|c| c.text).collect())
    }
}
