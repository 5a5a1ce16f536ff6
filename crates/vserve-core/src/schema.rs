use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vserve_backend::ParamValue;

/// Output length bound, validated to `[MaxTokens::MIN, MaxTokens::MAX]` at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MaxTokens(u32);

impl MaxTokens {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 2048;
    pub const DEFAULT: u32 = 400;

    pub fn get(self) -> u32 { self.0 }
}

impl Default for MaxTokens {
    fn default() -> Self { Self(Self::DEFAULT) }
}

impl TryFrom<i64> for MaxTokens {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&v) {
            Ok(Self(v as u32))
        } else {
            Err(format!("max_tokens must be between {} and {}, got {v}", Self::MIN, Self::MAX))
        }
    }
}

impl From<MaxTokens> for i64 {
    fn from(v: MaxTokens) -> Self { v.0 as i64 }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    /// Either a string or a list of strings; the shape is checked by [`crate::Prompt::from_value`]
    /// so a wrong type can be reported by name.
    pub prompt: Value,
    #[serde(default)]
    pub max_tokens: MaxTokens,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, ParamValue>>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<Value>) -> Self {
        Self { prompt: prompt.into(), max_tokens: MaxTokens::default(), parameters: None }
    }

    pub fn with_max_tokens(mut self, max_tokens: MaxTokens) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Completion {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub completion: Completion,
}
