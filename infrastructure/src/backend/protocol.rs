//! Wire envelopes for backend communication.
//!
//! Two shapes exist:
//!
//! - **JSON-RPC 2.0** for the pr/metrics/pricing backends, over HTTP or a
//!   supervised subprocess pipe: request
//!   `{jsonrpc, id, method: "tools/call", params: {name, arguments}}`,
//!   response `{jsonrpc, id, result}` or `{jsonrpc, id, error}`.
//! - **Legacy gateway** for `ecs_call_tool`/`iac_call_tool`:
//!   `{server, tool, params}` POSTed to a fixed `/call-tool` path.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a unique request ID.
fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }

    /// The `tools/call` envelope every backend understands.
    pub fn tools_call(tool_name: &str, arguments: serde_json::Value) -> Self {
        Self::new(
            "tools/call",
            Some(serde_json::json!({
                "name": tool_name,
                "arguments": arguments,
            })),
        )
    }
}

/// JSON-RPC response.
///
/// The `error` member is kept as a raw value: well-behaved backends send
/// `{code, message}` objects, but some report a bare string, and the
/// broker must extract a message either way.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// The backend-reported error message, whether the `error` member was
    /// a string or a structured object.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(match error {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(map) => match map.get("message") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => error.to_string(),
            },
            other => other.to_string(),
        })
    }
}

/// Request body for the legacy gateway's `/call-tool` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCallRequest {
    pub server: String,
    pub tool: String,
    pub params: serde_json::Value,
}
