//! Observability: tracing subscriber setup and request metrics

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use opentelemetry_otlp::WithExportConfig;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Exports spans over OTLP when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
            .install_simple()
            .ok();
        if let Some(tracer) = tracer {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(OpenTelemetryLayer::new(tracer))
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Flushes pending spans; a no-op when no exporter was installed.
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Per-service metrics. Owns its registry so several routers can coexist in one process.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests_total: IntCounter,
    pub prompts_total: IntCounter,
    pub failures_total: IntCounterVec,
    pub request_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let requests_total = IntCounter::new("vserve_requests_total", "Total number of /completion requests")?;
        let prompts_total = IntCounter::new("vserve_prompts_total", "Prompts forwarded to the engine")?;
        let failures_total = IntCounterVec::new(
            Opts::new("vserve_request_failures_total", "Failed /completion requests by status"),
            &["status"],
        )?;
        let request_seconds = Histogram::with_opts(HistogramOpts::new(
            "vserve_request_seconds",
            "End-to-end /completion latency",
        ))?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(prompts_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(request_seconds.clone()))?;
        Ok(Self { registry, requests_total, prompts_total, failures_total, request_seconds })
    }

    pub fn record_failure(&self, status: u16) {
        self.failures_total.with_label_values(&[status.to_string().as_str()]).inc();
    }

    /// Text exposition of every metric in this registry.
    pub fn render(&self, encoder: &TextEncoder) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
