//! Pre-execution intent guard.
//!
//! Runs once per request, before the agent loop starts: a cheap early
//! exit for requests that are obviously underspecified or outside the
//! tier's capabilities. It is a safety net, not a substitute for the
//! per-call parameter resolver, which still runs for every proposed tool
//! call.

use opsgate_domain::{
    GuardBlock, GuardVerdict, Intent, PromptExtractor, RequestContext, Tier, TierPolicy,
};
use std::sync::Arc;
use tracing::debug;

/// Classifies the prompt and applies per-category preconditions.
pub struct IntentGuard {
    extractor: Arc<dyn PromptExtractor>,
    policy: Arc<TierPolicy>,
}

impl IntentGuard {
    pub fn new(extractor: Arc<dyn PromptExtractor>, policy: Arc<TierPolicy>) -> Self {
        Self { extractor, policy }
    }

    /// Check the request. A `Blocked` verdict short-circuits everything:
    /// no agent session, no tool calls, no backend I/O.
    pub fn check(&self, ctx: &RequestContext) -> GuardVerdict {
        let intent = self.extractor.intent(ctx.prompt());
        debug!(intent = %intent, tier = %ctx.tier(), "intent classified");

        let block = match intent {
            Intent::Pr => self.check_pr(ctx),
            Intent::Pricing => self.check_pricing(ctx),
            Intent::Deployment => self.check_deployment(ctx),
            Intent::General => None,
        };

        match block {
            Some(block) => {
                debug!(error_type = %block.error_type, "guard blocked request");
                GuardVerdict::Blocked(block)
            }
            None => GuardVerdict::Proceed,
        }
    }

    /// PR requests need a resolvable PR number, and — for the user tier —
    /// at least one PR tool in the allow-set. The capability check mirrors
    /// the firewall but fires before an agent round-trip is spent.
    fn check_pr(&self, ctx: &RequestContext) -> Option<GuardBlock> {
        let pr_number = ctx
            .metadata_u64(&["pr_number"])
            .or_else(|| self.extractor.pr_number(ctx.prompt()));
        if pr_number.is_none() {
            return Some(GuardBlock::missing_params(
                "This looks like a pull-request question, but no PR number could be determined. \
                 Mention one like '#42' or supply pr_number metadata.",
                vec!["pr_number".to_string()],
            ));
        }

        if ctx.tier() == Tier::User && !self.policy.has_tool_with_prefix("pr_", Tier::User) {
            return Some(GuardBlock::denied_capability(
                "Pull-request analysis is not available to the user tier. \
                 Use the admin endpoint for PR tools.",
            ));
        }

        None
    }

    /// Pricing requests about an already-deployed stack need a stack name.
    /// Template-based estimates carry the template in the conversation and
    /// need nothing up front.
    fn check_pricing(&self, ctx: &RequestContext) -> Option<GuardBlock> {
        if !self.extractor.mentions_existing_stack(ctx.prompt()) {
            return None;
        }
        let stack = ctx
            .metadata_str(&["stack_name"])
            .map(str::to_string)
            .or_else(|| self.extractor.stack_name(ctx.prompt()));
        if stack.is_none() {
            return Some(GuardBlock::missing_params(
                "Cost estimation for a deployed stack needs the stack name. \
                 Name it in the request or supply stack_name metadata.",
                vec!["stack_name".to_string()],
            ));
        }
        None
    }

    /// Deployment-metrics requests need a repository identifier from
    /// metadata (either accepted key).
    fn check_deployment(&self, ctx: &RequestContext) -> Option<GuardBlock> {
        if ctx.metadata_str(&["repository", "repo"]).is_none() {
            return Some(GuardBlock::missing_params(
                "Deployment metrics need a repository. Supply repository metadata.",
                vec!["repository".to_string()],
            ));
        }
        None
    }
}
