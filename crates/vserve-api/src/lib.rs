//! HTTP API: health check and completion endpoint

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{FromRequest, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use vserve_backend::{mock::MockEngine, EngineParams, InferenceEngine};
use vserve_backend_remote::RemoteEngine;
use vserve_common::config::ServeConfig;
use vserve_common::{Result, ServeError};
use vserve_core::{Completion, CompletionRequest, CompletionResponse};
use vserve_obs::Metrics;

mod error;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn InferenceEngine>,
    model_name: Arc<str>,
    metrics: Metrics,
}

/// JSON body extractor whose rejections use the `{"detail": ...}` error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

static ENCODER: Lazy<TextEncoder> = Lazy::new(TextEncoder::new);

/// Builds the router around an already constructed engine.
pub fn app(engine: Arc<dyn InferenceEngine>, model_name: impl Into<String>) -> Result<Router> {
    let metrics = Metrics::new().map_err(|e| ServeError::startup(format!("metrics registry: {e}")))?;
    let state = AppState { engine, model_name: Arc::from(model_name.into()), metrics };

    Ok(Router::new()
        .route("/", get(health))
        .route("/completion/", post(completion))
        .route("/completion", post(completion))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi))
        .with_state(state))
}

/// Constructs the configured engine and the router serving it.
pub async fn bootstrap(cfg: &ServeConfig) -> Result<Router> {
    let engine = select_engine(cfg).await?;
    app(engine, cfg.model_name())
}

pub async fn select_engine(cfg: &ServeConfig) -> Result<Arc<dyn InferenceEngine>> {
    let params = EngineParams::from_config(cfg);
    match cfg.engine_url {
        Some(ref url) => {
            let engine = RemoteEngine::connect(url, params).await?;
            tracing::info!(target: "api", "using remote engine for model {}", cfg.model);
            Ok(Arc::new(engine))
        }
        None => {
            tracing::warn!(target: "api", "VSERVE_ENGINE_URL not set, serving {} with the mock engine", cfg.model);
            Ok(Arc::new(MockEngine::new()))
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Model")]
    model: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "Healthy", model: state.model_name.to_string() })
}

async fn completion(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CompletionRequest>,
) -> std::result::Result<Json<CompletionResponse>, ApiError> {
    state.metrics.requests_total.inc();
    tracing::info!(target: "api", max_tokens = req.max_tokens.get(), "completion request");
    let start = Instant::now();
    let result = vserve_core::complete(state.engine.as_ref(), req).await;
    state.metrics.request_seconds.observe(start.elapsed().as_secs_f64());

    match result {
        Ok(resp) => {
            let prompts = match resp.completion {
                Completion::Single(_) => 1,
                Completion::Batch(ref v) => v.len() as u64,
            };
            state.metrics.prompts_total.inc_by(prompts);
            Ok(Json(resp))
        }
        Err(e) => {
            let err = ApiError::from(e);
            state.metrics.record_failure(err.status().as_u16());
            Err(err)
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> std::result::Result<impl IntoResponse, ApiError> {
    let buffer = state.metrics.render(&ENCODER).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, ENCODER.format_type().to_string())], buffer))
}

async fn openapi() -> impl IntoResponse {
    let spec = serde_json::json!({
        "openapi": "3.0.0",
        "info": {"title": "vserve", "version": env!("CARGO_PKG_VERSION")},
        "paths": {
            "/": {"get": {"summary": "Health check and active model"}},
            "/completion/": {"post": {
                "summary": "Complete one prompt or a batch of prompts",
                "responses": {
                    "200": {"description": "Completion(s), same cardinality as the prompt"},
                    "400": {"description": "Empty prompt list or wrong prompt type"},
                    "422": {"description": "Schema validation failure"},
                    "500": {"description": "Inference failure"}
                }
            }},
            "/metrics": {"get": {"summary": "Prometheus metrics"}},
            "/openapi.json": {"get": {"summary": "This document"}}
        }
    });
    Json(spec)
}
