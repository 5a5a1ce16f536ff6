//! Inference engine contract shared by the API layer and the concrete engines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vserve_common::config::ServeConfig;
use vserve_common::Result;

/// A single sampling parameter value. Anything outside this set is rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Parses a command-line literal: booleans, then integers, then floats, else text.
    pub fn parse_literal(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() { return Self::Bool(b); }
        if let Ok(i) = raw.parse::<i64>() { return Self::Int(i); }
        if let Ok(f) = raw.parse::<f64>() { return Self::Float(f); }
        Self::Text(raw.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue { fn from(v: f64) -> Self { Self::Float(v) } }
impl From<i64> for ParamValue { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<bool> for ParamValue { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<&str> for ParamValue { fn from(v: &str) -> Self { Self::Text(v.to_string()) } }

/// Effective sampling configuration for one engine call, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SamplingConfig(BTreeMap<String, ParamValue>);

impl SamplingConfig {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> { self.0.get(key) }

    pub fn contains_key(&self, key: &str) -> bool { self.0.contains_key(key) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> { self.0.iter() }

    pub fn max_tokens(&self) -> Option<i64> {
        self.get("max_tokens").and_then(ParamValue::as_i64)
    }
}

impl Extend<(String, ParamValue)> for SamplingConfig {
    fn extend<I: IntoIterator<Item = (String, ParamValue)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Construction parameters for an engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub model: String,
    pub tensor_parallel_size: usize,
    pub dtype: String,
    pub gpu_memory_utilization: f32,
    pub trust_remote_code: bool,
}

impl EngineParams {
    pub fn from_config(cfg: &ServeConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            tensor_parallel_size: cfg.engine.tensor_parallel_size,
            dtype: cfg.engine.dtype.clone(),
            gpu_memory_utilization: cfg.engine.gpu_memory_utilization,
            trust_remote_code: cfg.engine.trust_remote_code,
        }
    }
}

#[async_trait::async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Parameter names the engine understands, when it publishes them.
    /// `None` means unknown keys are forwarded and rejected by the engine itself.
    fn accepted_parameters(&self) -> Option<&[String]> { None }

    /// Generates one completion per prompt, in input order.
    async fn generate(&self, prompts: &[String], sampling: &SamplingConfig) -> Result<Vec<String>>;
}

#[cfg(feature = "mock")]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vserve_common::ServeError;

    /// Echo engine: bytes as tokens, each prompt cut to `max_tokens` characters.
    #[derive(Default)]
    pub struct MockEngine {
        fail_with: Option<String>,
        accepted: Option<Vec<String>>,
        last_sampling: Mutex<Option<SamplingConfig>>,
        calls: AtomicUsize,
    }

    impl MockEngine {
        pub fn new() -> Self { Self::default() }

        pub fn failing(msg: impl Into<String>) -> Self {
            Self { fail_with: Some(msg.into()), ..Self::default() }
        }

        pub fn with_accepted_parameters<I, S>(mut self, keys: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.accepted = Some(keys.into_iter().map(Into::into).collect());
            self
        }

        pub fn last_sampling(&self) -> Option<SamplingConfig> {
            self.last_sampling.lock().ok().and_then(|g| g.clone())
        }

        pub fn calls(&self) -> usize { self.calls.load(Ordering::Relaxed) }
    }

    #[async_trait::async_trait]
    impl InferenceEngine for MockEngine {
        fn accepted_parameters(&self) -> Option<&[String]> { self.accepted.as_deref() }

        async fn generate(&self, prompts: &[String], sampling: &SamplingConfig) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut g) = self.last_sampling.lock() {
                *g = Some(sampling.clone());
            }
            if let Some(ref msg) = self.fail_with {
                return Err(ServeError::inference(msg.clone()));
            }
            let limit = sampling
                .max_tokens()
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(usize::MAX);
            Ok(prompts.iter().map(|p| p.chars().take(limit).collect()).collect())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn echoes_in_order_and_truncates() {
            let engine = MockEngine::new();
            let mut sampling = SamplingConfig::new();
            sampling.insert("max_tokens", 3_i64);
            let out = engine
                .generate(&["hello".into(), "ab".into()], &sampling)
                .await
                .unwrap();
            assert_eq!(out, vec!["hel".to_string(), "ab".to_string()]);
            assert_eq!(engine.last_sampling(), Some(sampling));
            assert_eq!(engine.calls(), 1);
        }

        #[tokio::test]
        async fn failing_engine_reports_inference_error() {
            let engine = MockEngine::failing("cuda out of memory");
            let err = engine.generate(&["x".into()], &SamplingConfig::new()).await.unwrap_err();
            assert!(matches!(err, ServeError::Inference(_)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_values_cover_the_closed_set() {
        let v: BTreeMap<String, ParamValue> =
            serde_json::from_str(r#"{"a": true, "b": 7, "c": 0.5, "d": "x"}"#).unwrap();
        assert_eq!(v["a"], ParamValue::Bool(true));
        assert_eq!(v["b"], ParamValue::Int(7));
        assert_eq!(v["c"], ParamValue::Float(0.5));
        assert_eq!(v["d"], ParamValue::Text("x".into()));
        assert!(serde_json::from_str::<BTreeMap<String, ParamValue>>(r#"{"a": null}"#).is_err());
        assert!(serde_json::from_str::<BTreeMap<String, ParamValue>>(r#"{"a": [1]}"#).is_err());
    }

    #[test]
    fn parse_literal_prefers_narrow_types() {
        assert_eq!(ParamValue::parse_literal("true"), ParamValue::Bool(true));
        assert_eq!(ParamValue::parse_literal("12"), ParamValue::Int(12));
        assert_eq!(ParamValue::parse_literal("0.7"), ParamValue::Float(0.7));
        assert_eq!(ParamValue::parse_literal("</s>"), ParamValue::Text("</s>".into()));
    }

    #[test]
    fn sampling_config_serializes_flat() {
        let mut s = SamplingConfig::new();
        s.insert("top_p", 1.0);
        s.insert("max_tokens", 16_i64);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json, serde_json::json!({"max_tokens": 16, "top_p": 1.0}));
        assert_eq!(s.max_tokens(), Some(16));
    }
}
