//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tier: {0} (expected 'user' or 'admin')")]
    InvalidTier(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tier_display() {
        let error = DomainError::InvalidTier("root".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid tier: root (expected 'user' or 'admin')"
        );
    }

    #[test]
    fn test_unknown_tool_display() {
        let error = DomainError::UnknownTool("frobnicate".to_string());
        assert_eq!(error.to_string(), "Unknown tool: frobnicate");
    }
}
