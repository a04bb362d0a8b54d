//! Tool outcome value objects.
//!
//! [`ToolOutcome`] is the single result type every stage of the
//! firewall → resolver → router pipeline produces. Rejections are values,
//! not errors: a denied or under-specified call is an expected outcome the
//! agent loop folds back as an error-flagged tool result so the model can
//! self-correct.

use crate::policy::Tier;
use serde::{Deserialize, Serialize};

/// Machine-readable classification of a non-Ok outcome.
///
/// | Variant | Produced by | Retried? |
/// |---------|-------------|----------|
/// | `DeniedTool` | firewall | never |
/// | `DeniedCapability` | intent guard | never |
/// | `MissingParams` | resolver or guard | never |
/// | `BackendError` | router / supervisor | never |
/// | `Timeout` | router / supervisor | never |
/// | `InternalError` | outermost request boundary | never |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    DeniedTool,
    DeniedCapability,
    MissingParams,
    BackendError,
    Timeout,
    InternalError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DeniedTool => "DENIED_TOOL",
            ErrorType::DeniedCapability => "DENIED_CAPABILITY",
            ErrorType::MissingParams => "MISSING_PARAMS",
            ErrorType::BackendError => "BACKEND_ERROR",
            ErrorType::Timeout => "TIMEOUT",
            ErrorType::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of routing one tool call through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The backend produced a payload.
    Ok { payload: serde_json::Value },
    /// The firewall refused the tool for the calling tier.
    Denied {
        tool_name: String,
        tier: Tier,
        message: String,
    },
    /// Resolution left required fields unfilled.
    MissingParams {
        tool_name: String,
        missing: Vec<String>,
    },
    /// Transport failure, malformed response, or backend-reported error.
    BackendError { message: String },
    /// No response within the backend's time budget.
    Timeout,
}

impl ToolOutcome {
    pub fn ok(payload: serde_json::Value) -> Self {
        ToolOutcome::Ok { payload }
    }

    pub fn backend_error(message: impl Into<String>) -> Self {
        ToolOutcome::BackendError {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutcome::Ok { .. })
    }

    /// The error classification, if this outcome is not `Ok`.
    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            ToolOutcome::Ok { .. } => None,
            ToolOutcome::Denied { .. } => Some(ErrorType::DeniedTool),
            ToolOutcome::MissingParams { .. } => Some(ErrorType::MissingParams),
            ToolOutcome::BackendError { .. } => Some(ErrorType::BackendError),
            ToolOutcome::Timeout => Some(ErrorType::Timeout),
        }
    }

    /// Text folded back into the agent loop as the tool result.
    ///
    /// Rejections include the structured reason so the model can ask for
    /// the missing field or pick an allowed tool instead of retrying
    /// blindly.
    pub fn text_for_agent(&self) -> String {
        match self {
            ToolOutcome::Ok { payload } => match payload {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            ToolOutcome::Denied { message, .. } => message.clone(),
            ToolOutcome::MissingParams { tool_name, missing } => format!(
                "Cannot run {}: missing required parameters: {}",
                tool_name,
                missing.join(", ")
            ),
            ToolOutcome::BackendError { message } => format!("Backend error: {}", message),
            ToolOutcome::Timeout => "Backend did not respond within its time budget".to_string(),
        }
    }
}
