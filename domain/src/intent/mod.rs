//! Intent classification and guard verdict types.
//!
//! A prompt is classified into exactly one coarse [`Intent`] before the
//! agent loop starts. The guard applies per-category preconditions and
//! either proceeds or blocks the whole request with a structured
//! [`GuardVerdict`].

use crate::tool::value_objects::ErrorType;
use serde::{Deserialize, Serialize};

/// Coarse category of a free-text request.
///
/// Assigned first-match-wins across an ordered pattern list: PR patterns
/// are checked before pricing, pricing before deployment, and anything
/// left falls through to general.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Pr,
    Pricing,
    Deployment,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Pr => "pr",
            Intent::Pricing => "pricing",
            Intent::Deployment => "deployment",
            Intent::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of the pre-execution intent guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardVerdict {
    /// Preconditions hold; start the agent loop.
    Proceed,
    /// The request is rejected before any agent or backend work.
    Blocked(GuardBlock),
}

/// Structured rejection produced by the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardBlock {
    pub error_type: ErrorType,
    pub message: String,
    /// Canonical resolver keys that could not be resolved, when the
    /// rejection is `MISSING_PARAMS`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl GuardBlock {
    pub fn missing_params(message: impl Into<String>, missing_fields: Vec<String>) -> Self {
        Self {
            error_type: ErrorType::MissingParams,
            message: message.into(),
            missing_fields,
        }
    }

    pub fn denied_capability(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::DeniedCapability,
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }
}

impl GuardVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GuardVerdict::Blocked(_))
    }
}
