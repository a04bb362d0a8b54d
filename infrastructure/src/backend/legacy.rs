//! Legacy gateway client.
//!
//! The two individually-routed tools (`ecs_call_tool`, `iac_call_tool`)
//! do not speak JSON-RPC: the gateway accepts `{server, tool, params}`
//! POSTed to a fixed `/call-tool` path and answers with a plain JSON
//! payload. Legacy calls run under a shorter timeout than the JSON-RPC
//! backends.

use crate::backend::error::{BackendError, Result};
use crate::backend::protocol::LegacyCallRequest;
use std::time::Duration;
use tracing::debug;

/// Path the gateway serves for tool invocation.
const CALL_TOOL_PATH: &str = "/call-tool";

/// Client for the legacy `{server, tool, params}` gateway.
pub struct LegacyGatewayClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl LegacyGatewayClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Invoke `tool` on `server` through the gateway at `base_url`.
    pub async fn call_tool(
        &self,
        base_url: &str,
        server: &str,
        tool: &str,
        params: serde_json::Value,
        correlation_id: &str,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), CALL_TOOL_PATH);
        debug!(%url, server, tool, "posting legacy gateway call");

        let body = LegacyCallRequest {
            server: server.to_string(),
            tool: tool.to_string(),
            params,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-correlation-id", correlation_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpError(format!(
                "legacy gateway returned {}: {}",
                status,
                opsgate_domain::truncate(&text, 200)
            )));
        }

        let raw = response.text().await.map_err(|e| BackendError::HttpError(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| BackendError::ParseError {
            error: e.to_string(),
            raw: opsgate_domain::truncate(&raw, 500),
        })
    }
}
