//! Request normalization, sampling resolution and response shaping

pub mod complete;
pub mod prompt;
pub mod sampling;
pub mod schema;

pub use complete::complete;
pub use prompt::{Prompt, Shape};
pub use schema::{Completion, CompletionRequest, CompletionResponse, MaxTokens};
