//! Error types for backend adapters

use opsgate_domain::ToolOutcome;
use thiserror::Error;

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur when calling a backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to parse response: {error}\nRaw response: {raw}")]
    ParseError { error: String, raw: String },

    #[error("Backend reported error: {0}")]
    Reported(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Backend pipe closed")]
    PipeClosed,

    #[error("Request timeout")]
    Timeout,

    #[error("No backend route for tool: {0}")]
    NoRoute(String),
}

impl BackendError {
    /// Normalize into the outcome the orchestrator folds back to the
    /// agent. Timeouts keep their own variant; everything else becomes a
    /// backend error with the underlying message, never a raw exception.
    pub fn into_outcome(self) -> ToolOutcome {
        match self {
            BackendError::Timeout => ToolOutcome::Timeout,
            other => ToolOutcome::backend_error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsgate_domain::ErrorType;

    #[test]
    fn test_timeout_normalizes_to_timeout_outcome() {
        assert_eq!(
            BackendError::Timeout.into_outcome().error_type(),
            Some(ErrorType::Timeout)
        );
    }

    #[test]
    fn test_other_errors_normalize_to_backend_error() {
        let outcome = BackendError::PipeClosed.into_outcome();
        assert_eq!(outcome.error_type(), Some(ErrorType::BackendError));
        match outcome {
            ToolOutcome::BackendError { message } => assert!(message.contains("pipe closed")),
            other => panic!("expected BackendError, got {:?}", other),
        }
    }
}
