//! Tool family classification.
//!
//! Tool names are namespaced by prefix (`pr_*`, `deploy_*`,
//! `pricingcalc_*`) or routed individually (`ecs_call_tool`,
//! `iac_call_tool`). [`ToolFamily::of`] derives the family exactly once
//! per name; both the parameter resolver (field tables) and the execution
//! router (backend target) key off the same value, so prefix logic lives
//! in one place only.

use serde::{Deserialize, Serialize};

/// Family of a tool name, determined by exact name or prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    /// `pr_*` — PR analysis tools (diff retrieval, summaries, compliance)
    Pr,
    /// `deploy_*` — deployment-metrics query tools
    Deploy,
    /// `pricingcalc_*` — AWS cost estimation tools
    Pricing,
    /// `ecs_call_tool` — legacy gateway passthrough for ECS queries
    EcsGateway,
    /// `iac_call_tool` — legacy gateway passthrough for IaC validation
    IacGateway,
}

/// Identifier of the backend that owns a tool family.
///
/// Prefix families map many-to-one; the two legacy tools share the
/// legacy gateway but keep distinct families (they carry different
/// `server` values on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    Pr,
    Metrics,
    Pricing,
    Legacy,
}

impl ToolFamily {
    /// Classify a tool name. Exact names are checked before prefixes.
    pub fn of(tool_name: &str) -> Option<Self> {
        match tool_name {
            "ecs_call_tool" => return Some(ToolFamily::EcsGateway),
            "iac_call_tool" => return Some(ToolFamily::IacGateway),
            _ => {}
        }
        if tool_name.starts_with("pr_") {
            Some(ToolFamily::Pr)
        } else if tool_name.starts_with("deploy_") {
            Some(ToolFamily::Deploy)
        } else if tool_name.starts_with("pricingcalc_") {
            Some(ToolFamily::Pricing)
        } else {
            None
        }
    }

    /// The backend owning this family.
    pub fn backend(&self) -> BackendId {
        match self {
            ToolFamily::Pr => BackendId::Pr,
            ToolFamily::Deploy => BackendId::Metrics,
            ToolFamily::Pricing => BackendId::Pricing,
            ToolFamily::EcsGateway | ToolFamily::IacGateway => BackendId::Legacy,
        }
    }

    /// The `server` value used on the legacy gateway wire, if this family
    /// routes through it.
    pub fn legacy_server(&self) -> Option<&'static str> {
        match self {
            ToolFamily::EcsGateway => Some("ecs"),
            ToolFamily::IacGateway => Some("iac"),
            _ => None,
        }
    }
}

impl BackendId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Pr => "pr",
            BackendId::Metrics => "metrics",
            BackendId::Pricing => "pricing",
            BackendId::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
