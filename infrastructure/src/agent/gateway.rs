//! HTTP agent gateway.
//!
//! Adapter for the external planner/LLM service. The broker core never
//! builds prompts; it exchanges turns with the planner over a small JSON
//! protocol:
//!
//! - `POST {base}/sessions` with `{tools}` → `{session_id}`
//! - `POST {base}/sessions/{id}/messages` with `{prompt}` → turn
//! - `POST {base}/sessions/{id}/tool-results` with
//!   `{tool_name, output, is_error}` → turn
//!
//! where a turn is `{"type": "answer", "text": ...}` or
//! `{"type": "tool_call", "tool_name": ..., "arguments": {...}}`.
//!
//! A response body that ends before a turn decodes maps to
//! [`GatewayError::StreamEnded`] — the one signature the orchestrator
//! retries.

use async_trait::async_trait;
use opsgate_application::{AgentGateway, AgentSession, AgentTurn, GatewayError};
use opsgate_domain::{ToolCallRequest, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Gateway talking to a planner service over HTTP.
pub struct HttpAgentGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAgentGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct CreateSessionBody<'a> {
    tools: &'a [ToolDescriptor],
}

#[derive(Deserialize)]
struct CreateSessionReply {
    session_id: String,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct ToolResultBody<'a> {
    tool_name: &'a str,
    output: &'a str,
    is_error: bool,
}

/// One planner turn on the wire.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PlannerTurn {
    Answer {
        text: String,
    },
    ToolCall {
        tool_name: String,
        #[serde(default)]
        arguments: HashMap<String, serde_json::Value>,
    },
}

impl From<PlannerTurn> for AgentTurn {
    fn from(turn: PlannerTurn) -> Self {
        match turn {
            PlannerTurn::Answer { text } => AgentTurn::Answer(text),
            PlannerTurn::ToolCall {
                tool_name,
                arguments,
            } => AgentTurn::ToolCall(ToolCallRequest {
                tool_name,
                model_arguments: arguments,
            }),
        }
    }
}

/// Map a reqwest failure onto the gateway taxonomy. A decode failure
/// means the body ended (or broke) before a full turn arrived — the
/// stream-ended signature.
fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_decode() {
        GatewayError::StreamEnded(e.to_string())
    } else if e.is_connect() {
        GatewayError::ConnectionError(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn create_session(
        &self,
        tools: &[ToolDescriptor],
        correlation_id: &str,
    ) -> Result<Box<dyn AgentSession>, GatewayError> {
        let url = format!("{}/sessions", self.base_url.trim_end_matches('/'));
        debug!(%url, tool_count = tools.len(), "creating agent session");

        let reply: CreateSessionReply = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-correlation-id", correlation_id)
            .json(&CreateSessionBody { tools })
            .send()
            .await
            .map_err(map_reqwest_error)?
            .error_for_status()
            .map_err(|e| GatewayError::SessionError(e.to_string()))?
            .json()
            .await
            .map_err(map_reqwest_error)?;

        info!(session_id = %reply.session_id, "agent session created");

        Ok(Box::new(HttpAgentSession {
            client: self.client.clone(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            session_id: reply.session_id,
            correlation_id: correlation_id.to_string(),
            timeout: self.timeout,
        }))
    }
}

/// An open planner session.
pub struct HttpAgentSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    correlation_id: String,
    timeout: Duration,
}

impl HttpAgentSession {
    async fn post_turn<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AgentTurn, GatewayError> {
        let url = format!("{}/sessions/{}/{}", self.base_url, self.session_id, path);
        let turn: PlannerTurn = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-correlation-id", &self.correlation_id)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?
            .error_for_status()
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(map_reqwest_error)?;
        Ok(turn.into())
    }
}

#[async_trait]
impl AgentSession for HttpAgentSession {
    async fn send(&mut self, prompt: &str) -> Result<AgentTurn, GatewayError> {
        self.post_turn("messages", &MessageBody { prompt }).await
    }

    async fn send_tool_result(
        &mut self,
        tool_name: &str,
        output: &str,
        is_error: bool,
    ) -> Result<AgentTurn, GatewayError> {
        self.post_turn(
            "tool-results",
            &ToolResultBody {
                tool_name,
                output,
                is_error,
            },
        )
        .await
    }
}
