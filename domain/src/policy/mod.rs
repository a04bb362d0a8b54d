//! Tier policy — the tool firewall.
//!
//! [`TierPolicy`] is the fail-closed mapping from trust tier to allowed
//! tool names. The admin tier may run anything; the user tier is limited
//! to an explicitly enumerated allow-set with no prefix wildcards, so a
//! typo or an unknown name is denied rather than matched. The policy is
//! built once at startup and read-only afterwards.

use crate::core::error::DomainError;
use crate::tool::entities::ToolCatalog;
use crate::tool::value_objects::ToolOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// A caller's trust level, fixed per entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Restricted tier: infrastructure queries, metrics, pricing.
    User,
    /// Full tier: everything, including PR analysis tools.
    Admin,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::User => "user",
            Tier::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Tier::User),
            "admin" => Ok(Tier::Admin),
            other => Err(DomainError::InvalidTier(other.to_string())),
        }
    }
}

/// Fail-closed tier → allowed-tool mapping.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    catalog: ToolCatalog,
    user_allowed: HashSet<String>,
}

impl TierPolicy {
    /// Build the standard policy over the standard catalog.
    ///
    /// The user allow-set is enumerated tool by tool; PR analysis tools
    /// are deliberately absent from it.
    pub fn standard() -> Self {
        Self::new(
            ToolCatalog::standard(),
            [
                "ecs_call_tool",
                "iac_call_tool",
                "deploy_query_metrics",
                "deploy_get_run",
                "pricingcalc_estimate",
                "pricingcalc_stack_cost",
            ],
        )
    }

    /// Build a policy with an explicit user allow-set (used by tests and
    /// non-standard deployments).
    pub fn new<I, S>(catalog: ToolCatalog, user_allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog,
            user_allowed: user_allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `tool_name` may run for `tier`.
    ///
    /// Admin is always allowed; everything else requires explicit
    /// membership in the allow-set.
    pub fn is_allowed(&self, tool_name: &str, tier: Tier) -> bool {
        match tier {
            Tier::Admin => true,
            Tier::User => self.user_allowed.contains(tool_name),
        }
    }

    /// Whether `tier` has at least one tool with the given name prefix.
    ///
    /// Used by the intent guard to reject a capability the tier lacks
    /// before any agent round-trip is spent.
    pub fn has_tool_with_prefix(&self, prefix: &str, tier: Tier) -> bool {
        self.allowed_tools(tier)
            .iter()
            .any(|name| name.starts_with(prefix))
    }

    /// The denial outcome for a refused call, carrying enough structure
    /// for the caller to self-correct.
    pub fn denied(&self, tool_name: &str, tier: Tier) -> ToolOutcome {
        ToolOutcome::Denied {
            tool_name: tool_name.to_string(),
            tier,
            message: format!(
                "Tool '{}' is not available to the {} tier. Use the admin endpoint for full tool access.",
                tool_name, tier
            ),
        }
    }

    /// Tool names advertised to `tier`, in catalog order.
    pub fn allowed_tools(&self, tier: Tier) -> Vec<String> {
        self.catalog
            .names()
            .filter(|name| self.is_allowed(name, tier))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ErrorType;

    #[test]
    fn test_admin_allows_everything() {
        let policy = TierPolicy::standard();
        for name in policy.catalog().names().collect::<Vec<_>>() {
            assert!(policy.is_allowed(name, Tier::Admin), "admin denied {}", name);
        }
        // Admin is allowed even for names outside the catalog
        assert!(policy.is_allowed("some_future_tool", Tier::Admin));
    }

    #[test]
    fn test_user_tier_is_fail_closed() {
        let policy = TierPolicy::standard();
        assert!(!policy.is_allowed("pr_get_diff", Tier::User));
        assert!(!policy.is_allowed("pr_summarize", Tier::User));
        assert!(!policy.is_allowed("pr_check_compliance", Tier::User));
        // Typos and unknown names are denied, not prefix-matched
        assert!(!policy.is_allowed("ecs_call_tools", Tier::User));
        assert!(!policy.is_allowed("deploy_", Tier::User));
        assert!(!policy.is_allowed("", Tier::User));
    }

    #[test]
    fn test_user_allow_set_membership() {
        let policy = TierPolicy::standard();
        assert!(policy.is_allowed("ecs_call_tool", Tier::User));
        assert!(policy.is_allowed("iac_call_tool", Tier::User));
        assert!(policy.is_allowed("deploy_query_metrics", Tier::User));
        assert!(policy.is_allowed("deploy_get_run", Tier::User));
        assert!(policy.is_allowed("pricingcalc_estimate", Tier::User));
        assert!(policy.is_allowed("pricingcalc_stack_cost", Tier::User));
    }

    #[test]
    fn test_denied_outcome_structure() {
        let policy = TierPolicy::standard();
        let outcome = policy.denied("pr_get_diff", Tier::User);
        assert_eq!(outcome.error_type(), Some(ErrorType::DeniedTool));
        match outcome {
            ToolOutcome::Denied {
                tool_name,
                tier,
                message,
            } => {
                assert_eq!(tool_name, "pr_get_diff");
                assert_eq!(tier, Tier::User);
                assert!(message.contains("admin endpoint"));
            }
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[test]
    fn test_prefix_capability_check() {
        let policy = TierPolicy::standard();
        assert!(!policy.has_tool_with_prefix("pr_", Tier::User));
        assert!(policy.has_tool_with_prefix("pr_", Tier::Admin));
        assert!(policy.has_tool_with_prefix("deploy_", Tier::User));
    }

    #[test]
    fn test_allowed_tools_counts() {
        let policy = TierPolicy::standard();
        assert_eq!(policy.allowed_tools(Tier::User).len(), 6);
        assert_eq!(policy.allowed_tools(Tier::Admin).len(), 9);
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("user".parse::<Tier>().unwrap(), Tier::User);
        assert_eq!("ADMIN".parse::<Tier>().unwrap(), Tier::Admin);
        assert!("root".parse::<Tier>().is_err());
    }
}
