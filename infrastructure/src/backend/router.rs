//! Execution router.
//!
//! [`ExecutionRouter`] implements the application's `ToolRouterPort`. The
//! family → backend-target table is built once at construction; dispatch
//! derives the [`ToolFamily`] for the tool name (the same derivation the
//! resolver uses) and forwards the JSON-RPC envelope to the owning
//! backend — a supervised subprocess, a remote HTTP endpoint, or the
//! legacy gateway. Every failure is normalized into a `ToolOutcome`
//! value; the firewall ran before dispatch, so an unroutable name here is
//! a defensive error, not an expected path.

use crate::backend::error::BackendError;
use crate::backend::http::HttpBackendClient;
use crate::backend::legacy::LegacyGatewayClient;
use crate::backend::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::backend::supervisor::ProcessSupervisor;
use async_trait::async_trait;
use opsgate_application::ToolRouterPort;
use opsgate_domain::{BackendId, ResolvedArguments, ToolFamily, ToolOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where one JSON-RPC backend lives.
#[derive(Debug, Clone)]
pub enum BackendTarget {
    /// A subprocess owned by the [`ProcessSupervisor`], keyed by name.
    Supervised { name: String },
    /// A remote JSON-RPC endpoint. With `url: None` the endpoint is
    /// derived per call from the resolved `backend_url` as
    /// `{backend_url}/backends/{id}`.
    Http { url: Option<String> },
}

/// Router from tool names to backend calls.
pub struct ExecutionRouter {
    table: Vec<(BackendId, BackendTarget)>,
    supervisor: Arc<ProcessSupervisor>,
    http: HttpBackendClient,
    legacy: LegacyGatewayClient,
}

impl ExecutionRouter {
    /// Build the router with its routing table. Targets cover the
    /// JSON-RPC backends; the legacy gateway is addressed per call via
    /// the resolved `backend_url`.
    pub fn new(supervisor: Arc<ProcessSupervisor>, targets: Vec<(BackendId, BackendTarget)>) -> Self {
        Self {
            table: targets,
            supervisor,
            http: HttpBackendClient::new(Duration::from_secs(45)),
            legacy: LegacyGatewayClient::new(Duration::from_secs(10)),
        }
    }

    /// Per-backend timeouts; legacy calls are budgeted shorter than the
    /// LLM-adjacent JSON-RPC backends.
    pub fn with_timeouts(mut self, request_timeout: Duration, legacy_timeout: Duration) -> Self {
        self.http = HttpBackendClient::new(request_timeout);
        self.legacy = LegacyGatewayClient::new(legacy_timeout);
        self
    }

    fn target(&self, backend: BackendId) -> Option<&BackendTarget> {
        self.table
            .iter()
            .find(|(id, _)| *id == backend)
            .map(|(_, target)| target)
    }

    async fn dispatch_json_rpc(
        &self,
        backend: BackendId,
        tool_name: &str,
        arguments: &ResolvedArguments,
        correlation_id: &str,
    ) -> ToolOutcome {
        let Some(target) = self.target(backend) else {
            warn!(%backend, tool = tool_name, "no routing table entry");
            return BackendError::NoRoute(tool_name.to_string()).into_outcome();
        };

        let request = JsonRpcRequest::tools_call(tool_name, arguments.to_value());
        let result = match target {
            BackendTarget::Supervised { name } => self.supervisor.call(name, &request).await,
            BackendTarget::Http { url } => {
                let derived;
                let url = match (url, arguments.get_str("backend_url")) {
                    (Some(url), _) => url.as_str(),
                    (None, Some(base)) => {
                        derived =
                            format!("{}/backends/{}", base.trim_end_matches('/'), backend);
                        derived.as_str()
                    }
                    (None, None) => {
                        return ToolOutcome::backend_error(format!(
                            "no endpoint configured for backend '{}'",
                            backend
                        ));
                    }
                };
                self.http.call(url, &request, correlation_id).await
            }
        };

        match result {
            Ok(response) => outcome_from_response(response),
            Err(e) => e.into_outcome(),
        }
    }

    async fn dispatch_legacy(
        &self,
        family: ToolFamily,
        tool_name: &str,
        arguments: &ResolvedArguments,
        correlation_id: &str,
    ) -> ToolOutcome {
        let Some(server) = family.legacy_server() else {
            return ToolOutcome::backend_error(format!(
                "tool '{}' is not a legacy gateway tool",
                tool_name
            ));
        };
        let Some(base_url) = arguments.get_str("backend_url") else {
            return ToolOutcome::backend_error("resolved arguments carry no backend_url");
        };
        let Some(gateway_tool) = arguments.get_str("tool") else {
            return ToolOutcome::backend_error("resolved arguments carry no gateway tool name");
        };

        // The gateway tool runs against the caller's account/region, so
        // the injected context rides along inside params.
        let mut params = arguments
            .get("params")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        if let serde_json::Value::Object(map) = &mut params {
            for key in ["account_id", "region"] {
                if let Some(value) = arguments.get(key) {
                    map.insert(key.to_string(), value.clone());
                }
            }
        }

        match self
            .legacy
            .call_tool(base_url, server, gateway_tool, params, correlation_id)
            .await
        {
            Ok(payload) => ToolOutcome::ok(payload),
            Err(e) => e.into_outcome(),
        }
    }
}

/// Normalize a JSON-RPC response into an outcome: a reported `error`
/// member beats `result`, and a response with neither is malformed.
fn outcome_from_response(response: JsonRpcResponse) -> ToolOutcome {
    if let Some(message) = response.error_message() {
        return ToolOutcome::backend_error(message);
    }
    match response.result {
        Some(payload) => ToolOutcome::ok(payload),
        None => ToolOutcome::backend_error("backend response carried neither result nor error"),
    }
}

#[async_trait]
impl ToolRouterPort for ExecutionRouter {
    async fn dispatch(
        &self,
        tool_name: &str,
        arguments: &ResolvedArguments,
        correlation_id: &str,
    ) -> ToolOutcome {
        let Some(family) = ToolFamily::of(tool_name) else {
            // Firewall and resolver ran first; reaching this is a bug in
            // the catalog, surfaced as a backend error rather than a panic.
            warn!(%correlation_id, tool = tool_name, "dispatch of unroutable tool name");
            return BackendError::NoRoute(tool_name.to_string()).into_outcome();
        };

        debug!(%correlation_id, tool = tool_name, backend = %family.backend(), "routing tool call");

        match family.backend() {
            BackendId::Legacy => {
                self.dispatch_legacy(family, tool_name, arguments, correlation_id)
                    .await
            }
            backend => {
                self.dispatch_json_rpc(backend, tool_name, arguments, correlation_id)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::supervisor::BackendCommand;
    use opsgate_domain::ErrorType;
    use std::collections::HashMap;

    fn args(pairs: &[(&str, serde_json::Value)]) -> ResolvedArguments {
        let mut args = ResolvedArguments::new();
        for (k, v) in pairs {
            args.insert(*k, v.clone());
        }
        args
    }

    fn supervised_router(name: &str, script: &str) -> ExecutionRouter {
        let supervisor = ProcessSupervisor::new(HashMap::from([(
            name.to_string(),
            BackendCommand::new("/bin/sh").with_args(["-c", script]),
        )]))
        .with_warmup(Duration::from_millis(10));
        ExecutionRouter::new(
            Arc::new(supervisor),
            vec![(
                BackendId::Pr,
                BackendTarget::Supervised {
                    name: name.to_string(),
                },
            )],
        )
    }

    #[tokio::test]
    async fn test_dispatch_to_supervised_backend() {
        let router = supervised_router(
            "pr",
            r#"while read line; do printf '{"jsonrpc":"2.0","id":1,"result":{"diff":"+1 -1"}}\n'; done"#,
        );
        let outcome = router
            .dispatch("pr_get_diff", &args(&[("pr_number", serde_json::json!(9))]), "corr-1")
            .await;
        match outcome {
            ToolOutcome::Ok { payload } => assert_eq!(payload["diff"], "+1 -1"),
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_reported_error_is_normalized() {
        let router = supervised_router(
            "pr",
            r#"while read line; do printf '{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"diff too large"}}\n'; done"#,
        );
        let outcome = router.dispatch("pr_get_diff", &args(&[]), "corr-1").await;
        assert_eq!(outcome.error_type(), Some(ErrorType::BackendError));
        assert!(outcome.text_for_agent().contains("diff too large"));
    }

    #[tokio::test]
    async fn test_unroutable_name_is_backend_error() {
        let router = supervised_router("pr", "cat");
        let outcome = router.dispatch("mystery_tool", &args(&[]), "corr-1").await;
        assert_eq!(outcome.error_type(), Some(ErrorType::BackendError));
    }

    #[tokio::test]
    async fn test_family_without_table_entry_is_backend_error() {
        // Router only knows the pr backend; deploy_* has no entry.
        let router = supervised_router("pr", "cat");
        let outcome = router
            .dispatch("deploy_query_metrics", &args(&[]), "corr-1")
            .await;
        assert_eq!(outcome.error_type(), Some(ErrorType::BackendError));
    }

    #[tokio::test]
    async fn test_legacy_dispatch_needs_gateway_tool() {
        let router = supervised_router("pr", "cat");
        let outcome = router
            .dispatch(
                "ecs_call_tool",
                &args(&[("backend_url", serde_json::json!("http://127.0.0.1:9"))]),
                "corr-1",
            )
            .await;
        assert_eq!(outcome.error_type(), Some(ErrorType::BackendError));
        assert!(outcome.text_for_agent().contains("gateway tool name"));
    }

    #[tokio::test]
    async fn test_legacy_unreachable_gateway_is_backend_error() {
        let router = supervised_router("pr", "cat");
        let outcome = router
            .dispatch(
                "ecs_call_tool",
                &args(&[
                    ("backend_url", serde_json::json!("http://127.0.0.1:9")),
                    ("tool", serde_json::json!("list_clusters")),
                    ("account_id", serde_json::json!("500330120558")),
                    ("region", serde_json::json!("us-east-1")),
                ]),
                "corr-1",
            )
            .await;
        assert_eq!(outcome.error_type(), Some(ErrorType::BackendError));
    }

    #[test]
    fn test_outcome_from_response_prefers_error() {
        let response: JsonRpcResponse = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"ok": true},
            "error": "late failure",
        }))
        .unwrap();
        assert_eq!(
            outcome_from_response(response).error_type(),
            Some(ErrorType::BackendError)
        );
    }

    #[test]
    fn test_outcome_from_empty_response_is_malformed() {
        let response: JsonRpcResponse = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": null,
            "error": null,
        }))
        .unwrap();
        let outcome = outcome_from_response(response);
        assert!(outcome.text_for_agent().contains("neither result nor error"));
    }
}
