//! Tool router port.
//!
//! Defines how the orchestrator dispatches a resolved tool call to its
//! owning backend. Dispatch is infallible at the type level: every
//! transport failure, timeout, or backend-reported error is normalized
//! into a [`ToolOutcome`] value.

use async_trait::async_trait;
use opsgate_domain::{ResolvedArguments, ToolOutcome};

/// Port for dispatching resolved tool calls to backends.
#[async_trait]
pub trait ToolRouterPort: Send + Sync {
    /// Execute `tool_name` with fully-resolved arguments.
    ///
    /// Callers must have passed the firewall and the resolver first; an
    /// unroutable name at this stage is reported as a backend error, not
    /// a panic.
    async fn dispatch(
        &self,
        tool_name: &str,
        arguments: &ResolvedArguments,
        correlation_id: &str,
    ) -> ToolOutcome;
}
