use std::collections::BTreeMap;

use vserve_backend::{ParamValue, SamplingConfig};
use vserve_common::{Result, ServeError};

use crate::schema::MaxTokens;

pub const DEFAULT_TEMPERATURE: f64 = 0.8;
pub const DEFAULT_REPETITION_PENALTY: f64 = 1.0;
pub const DEFAULT_TOP_P: f64 = 1.0;

pub fn defaults() -> SamplingConfig {
    let mut cfg = SamplingConfig::new();
    cfg.insert("temperature", DEFAULT_TEMPERATURE);
    cfg.insert("repetition_penalty", DEFAULT_REPETITION_PENALTY);
    cfg.insert("top_p", DEFAULT_TOP_P);
    cfg
}

/// Caller overrides win over the defaults key by key; `max_tokens` from the
/// request only fills in when no override set it.
pub fn resolve(
    overrides: Option<&BTreeMap<String, ParamValue>>,
    max_tokens: MaxTokens,
    accepted: Option<&[String]>,
) -> Result<SamplingConfig> {
    let mut cfg = defaults();
    if let Some(overrides) = overrides {
        if let Some(accepted) = accepted {
            let unknown: Vec<&str> = overrides
                .keys()
                .filter(|k| !accepted.iter().any(|a| a == *k))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(ServeError::invalid(format!("Unsupported sampling parameters: {}", unknown.join(", "))));
            }
        }
        cfg.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if !cfg.contains_key("max_tokens") {
        cfg.insert("max_tokens", i64::from(max_tokens));
    }
    Ok(cfg)
}
