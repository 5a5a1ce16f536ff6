pub type Result<T> = core::result::Result<T, ServeError>;

#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    /// Request content the handler refuses to forward (bad prompt shape, unknown parameter).
    #[error("{0}")]
    InvalidRequest(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("startup failed: {0}")]
    Startup(String),
}

impl ServeError {
    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidRequest(msg.into()) }
    pub fn inference(msg: impl Into<String>) -> Self { Self::Inference(msg.into()) }
    pub fn startup(msg: impl Into<String>) -> Self { Self::Startup(msg.into()) }
}

pub mod config {
    use serde::Deserialize;
    use std::env;
    use std::path::Path;
    use std::str::FromStr;

    use crate::{Result, ServeError};

    pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

    #[derive(Debug, Clone, Deserialize)]
    pub struct ServeConfig {
        /// Model identifier or path, e.g. `meta-llama/Llama-3.1-8B-Instruct`.
        pub model: String,
        #[serde(default = "default_bind")]
        pub bind: String,
        /// Base URL of an OpenAI-compatible completion server. Unset means the mock engine.
        #[serde(default)]
        pub engine_url: Option<String>,
        #[serde(default)]
        pub engine: EngineSettings,
    }

    /// Fixed construction parameters handed to the engine once at startup.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct EngineSettings {
        pub tensor_parallel_size: usize,
        pub dtype: String,
        pub gpu_memory_utilization: f32,
        pub trust_remote_code: bool,
    }

    impl Default for EngineSettings {
        fn default() -> Self {
            Self {
                tensor_parallel_size: 1,
                dtype: "bfloat16".into(),
                gpu_memory_utilization: 0.95,
                trust_remote_code: true,
            }
        }
    }

    fn default_bind() -> String { DEFAULT_BIND.into() }

    impl ServeConfig {
        /// Loads a `.env` file from the working directory (or a parent) if one exists,
        /// then reads `VSERVE_CONFIG` (YAML) when set, otherwise the process environment.
        /// Variables already present in the environment win over `.env` entries.
        pub fn load() -> Result<Self> {
            let _ = dotenvy::dotenv();
            Self::load_from_env()
        }

        /// Same as [`ServeConfig::load`] with an explicit dotenv file, which must exist.
        pub fn load_with_env_file(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            dotenvy::from_path(path)
                .map_err(|e| ServeError::startup(format!("cannot load {}: {e}", path.display())))?;
            Self::load_from_env()
        }

        fn load_from_env() -> Result<Self> {
            if let Ok(path) = env::var("VSERVE_CONFIG") {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| ServeError::startup(format!("cannot read config {path}: {e}")))?;
                return Self::from_yaml(&text);
            }
            Self::from_lookup(|key| env::var(key).ok())
        }

        pub fn from_yaml(text: &str) -> Result<Self> {
            let cfg: ServeConfig = serde_yaml::from_str(text)
                .map_err(|e| ServeError::startup(format!("invalid config: {e}")))?;
            cfg.validated()
        }

        pub fn from_lookup<F>(lookup: F) -> Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let model = lookup("MODEL_NAME")
                .ok_or_else(|| ServeError::startup("MODEL_NAME is not set"))?;
            let mut cfg = Self {
                model,
                bind: lookup("VSERVE_BIND").unwrap_or_else(default_bind),
                engine_url: lookup("VSERVE_ENGINE_URL").filter(|u| !u.is_empty()),
                engine: EngineSettings::default(),
            };
            if let Some(v) = parse_var(&lookup, "VSERVE_TENSOR_PARALLEL_SIZE")? {
                cfg.engine.tensor_parallel_size = v;
            }
            if let Some(v) = lookup("VSERVE_DTYPE") {
                cfg.engine.dtype = v;
            }
            if let Some(v) = parse_var(&lookup, "VSERVE_GPU_MEMORY_UTILIZATION")? {
                cfg.engine.gpu_memory_utilization = v;
            }
            if let Some(v) = parse_var(&lookup, "VSERVE_TRUST_REMOTE_CODE")? {
                cfg.engine.trust_remote_code = v;
            }
            cfg.validated()
        }

        /// Name reported by the health check: the last path segment of the model identifier.
        pub fn model_name(&self) -> &str {
            display_name(&self.model)
        }

        fn validated(self) -> Result<Self> {
            if self.model.trim().is_empty() {
                return Err(ServeError::startup("model identifier is empty"));
            }
            let util = self.engine.gpu_memory_utilization;
            if !(util > 0.0 && util <= 1.0) {
                return Err(ServeError::startup(format!(
                    "gpu_memory_utilization must be in (0, 1], got {util}"
                )));
            }
            if self.engine.tensor_parallel_size == 0 {
                return Err(ServeError::startup("tensor_parallel_size must be at least 1"));
            }
            Ok(self)
        }
    }

    pub fn display_name(model: &str) -> &str {
        let trimmed = model.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
    where
        F: Fn(&str) -> Option<String>,
        T: FromStr,
    {
        match lookup(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ServeError::startup(format!("{key} has an invalid value: {raw}"))),
        }
    }
}
