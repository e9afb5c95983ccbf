//! Client side of the text-generation service.
//!
//! The pipeline only talks to [`LlmProvider`]; [`OpenAIProvider`] is the one
//! production backend and works with any OpenAI-compatible endpoint.

mod openai;
mod provider;
mod types;

pub use openai::{ApiKeySource, OpenAIProvider};
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, TokenUsage};
