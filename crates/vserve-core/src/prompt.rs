use serde_json::Value;
use vserve_common::{Result, ServeError};

use crate::schema::Completion;

#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Single(String),
    Batch(Vec<String>),
}

/// Which response form the caller gets back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Batch,
}

impl Prompt {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Single(s)),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(ServeError::invalid("List of prompts is empty"));
                }
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::String(s) => Ok(s),
                        other => Err(ServeError::invalid(format!(
                            "Invalid prompt at index {i}. Should be str; current format: {}",
                            type_name(&other)
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Self::Batch)
            }
            other => Err(ServeError::invalid(format!(
                "Invalid prompt format. Should be str or list; current format: {}",
                type_name(&other)
            ))),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Single(_) => Shape::Single,
            Self::Batch(_) => Shape::Batch,
        }
    }

    pub fn into_batch(self) -> (Shape, Vec<String>) {
        match self {
            Self::Single(s) => (Shape::Single, vec![s]),
            Self::Batch(v) => (Shape::Batch, v),
        }
    }
}

impl Shape {
    /// `completions` must already hold one entry per prompt.
    pub fn apply(self, completions: Vec<String>) -> Completion {
        match self {
            Self::Single => Completion::Single(completions.into_iter().next().unwrap_or_default()),
            Self::Batch => Completion::Batch(completions),
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
