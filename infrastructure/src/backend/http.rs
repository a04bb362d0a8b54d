//! JSON-RPC over HTTP for remote backends.

use crate::backend::error::{BackendError, Result};
use crate::backend::protocol::{JsonRpcRequest, JsonRpcResponse};
use std::time::Duration;
use tracing::debug;

/// HTTP client for backends exposing the JSON-RPC `tools/call` envelope.
///
/// One client is shared across requests; reqwest pools connections
/// internally. The per-call timeout covers the whole exchange.
pub struct HttpBackendClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackendClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// POST the envelope to `url` and parse the JSON-RPC response.
    ///
    /// Timeouts map to [`BackendError::Timeout`]; any other transport or
    /// decode failure maps to an error value, never a panic.
    pub async fn call(
        &self,
        url: &str,
        request: &JsonRpcRequest,
        correlation_id: &str,
    ) -> Result<JsonRpcResponse> {
        debug!(%url, id = request.id, "posting JSON-RPC request");

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("x-correlation-id", correlation_id)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpError(format!(
                "backend returned {}: {}",
                status,
                opsgate_domain::truncate(&body, 200)
            )));
        }

        let raw = response.text().await.map_err(map_reqwest_error)?;
        serde_json::from_str(&raw).map_err(|e| BackendError::ParseError {
            error: e.to_string(),
            raw: opsgate_domain::truncate(&raw, 500),
        })
    }
}

/// Timeout-aware mapping from reqwest errors.
fn map_reqwest_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::HttpError(e.to_string())
    }
}
