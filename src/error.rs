//! Error taxonomy shared by the generation pipeline and the library.

use crate::generation::CompletionError;
use crate::llm::LlmError;
use crate::progression::{KeyError, SignatureError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller input failed validation before any network call was made.
    #[error("invalid request field '{field}': {reason}")]
    InvalidRequest { field: String, reason: String },

    #[error("generative service error: {0}")]
    Service(#[from] LlmError),

    /// The reply contained no parsable JSON object.
    #[error("malformed completion: {0}")]
    MalformedCompletion(String),

    /// The reply parsed but did not have the requested shape.
    #[error("completion field '{field}' {reason}")]
    SchemaViolation { field: String, reason: String },

    #[error("content store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl PipelineError {
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn store(err: anyhow::Error) -> Self {
        PipelineError::StoreUnavailable(format!("{:#}", err))
    }

    /// Stable machine-readable label, used in error bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest { .. } => "invalid_request",
            PipelineError::Service(_) => "service_error",
            PipelineError::MalformedCompletion(_) => "malformed_completion",
            PipelineError::SchemaViolation { .. } => "schema_violation",
            PipelineError::StoreUnavailable(_) => "store_unavailable",
            PipelineError::InvalidKey(_) => "invalid_key",
        }
    }
}

impl From<CompletionError> for PipelineError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Malformed(reason) => PipelineError::MalformedCompletion(reason),
            CompletionError::SchemaViolation { field, reason } => {
                PipelineError::SchemaViolation { field, reason }
            }
        }
    }
}

impl From<KeyError> for PipelineError {
    fn from(err: KeyError) -> Self {
        PipelineError::InvalidKey(err.to_string())
    }
}

/// Maps a chord list problem in caller input to the offending field.
pub(crate) fn invalid_progression(field: &str, err: SignatureError) -> PipelineError {
    PipelineError::invalid_request(field, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_errors_keep_their_category() {
        let err: PipelineError = CompletionError::Malformed("no braces".into()).into();
        assert_eq!(err.kind(), "malformed_completion");

        let err: PipelineError = CompletionError::SchemaViolation {
            field: "result".into(),
            reason: "is missing".into(),
        }
        .into();
        assert_eq!(err.kind(), "schema_violation");
        assert_eq!(err.to_string(), "completion field 'result' is missing");
    }

    #[test]
    fn store_error_keeps_context_chain() {
        let err = anyhow::anyhow!("disk I/O error").context("Failed to insert progression");
        let err = PipelineError::store(err);
        assert_eq!(
            err.to_string(),
            "content store unavailable: Failed to insert progression: disk I/O error"
        );
    }

    #[test]
    fn key_errors_become_invalid_key() {
        let err: PipelineError = KeyError::UnescapedSharp(1).into();
        assert_eq!(err.kind(), "invalid_key");
    }
}
