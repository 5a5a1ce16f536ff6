use serde_json::json;
use vserve_backend::mock::MockEngine;
use vserve_backend::ParamValue;
use vserve_common::ServeError;
use vserve_core::{complete, Completion, CompletionRequest, MaxTokens};

#[tokio::test]
async fn single_prompt_yields_single_completion() {
    let engine = MockEngine::new();
    let resp = complete(&engine, CompletionRequest::new("hello world")).await.unwrap();
    assert_eq!(resp.completion, Completion::Single("hello world".into()));
}

#[tokio::test]
async fn batch_prompt_yields_ordered_batch_in_one_call() {
    let engine = MockEngine::new();
    let prompts = vec!["alpha", "beta", "gamma", "delta"];
    let resp = complete(&engine, CompletionRequest::new(json!(prompts))).await.unwrap();
    assert_eq!(
        resp.completion,
        Completion::Batch(prompts.iter().map(|s| s.to_string()).collect())
    );
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn resolved_sampling_reaches_the_engine() {
    let engine = MockEngine::new();
    let req = CompletionRequest::new("abcdefghijklmnopqrstuvwxyz")
        .with_max_tokens(MaxTokens::try_from(12_i64).unwrap())
        .with_parameter("temperature", 0.0);
    let resp = complete(&engine, req).await.unwrap();
    assert_eq!(resp.completion, Completion::Single("abcdefghijkl".into()));

    let sampling = engine.last_sampling().unwrap();
    assert_eq!(sampling.get("temperature"), Some(&ParamValue::Float(0.0)));
    assert_eq!(sampling.max_tokens(), Some(12));
}

#[tokio::test]
async fn invalid_prompt_never_reaches_the_engine() {
    let engine = MockEngine::new();
    let err = complete(&engine, CompletionRequest::new(json!([]))).await.unwrap_err();
    assert!(matches!(err, ServeError::InvalidRequest(_)));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn engine_failure_propagates() {
    let engine = MockEngine::failing("boom");
    let err = complete(&engine, CompletionRequest::new("x")).await.unwrap_err();
    assert!(matches!(err, ServeError::Inference(_)));
}

#[tokio::test]
async fn unsupported_parameter_is_rejected_before_generation() {
    let engine = MockEngine::new().with_accepted_parameters(["temperature", "top_p", "max_tokens"]);
    let req = CompletionRequest::new("x").with_parameter("best_of", 3_i64);
    let err = complete(&engine, req).await.unwrap_err();
    assert!(matches!(err, ServeError::InvalidRequest(_)));
    assert_eq!(engine.calls(), 0);
}
