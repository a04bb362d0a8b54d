//! Agent gateway port.
//!
//! Defines the interface to the external LLM/planner layer. The broker
//! never builds prompts or parses model output itself — it opens a
//! session, sends the user's request, and receives a stream of
//! [`AgentTurn`]s: either a final answer or a proposed tool call whose
//! result is folded back with [`AgentSession::send_tool_result`].

use async_trait::async_trait;
use opsgate_domain::{ToolCallRequest, ToolDescriptor};
use thiserror::Error;

/// Errors that can occur while talking to the agent service.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The response stream ended before a complete turn arrived. This is
    /// the only failure the orchestrator retries (bounded, fixed backoff).
    #[error("Stream ended prematurely: {0}")]
    StreamEnded(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Whether this is the narrow stream-ended-prematurely signature the
    /// orchestrator may retry. Application-level failures never match.
    pub fn is_stream_ended(&self) -> bool {
        matches!(self, GatewayError::StreamEnded(_))
    }
}

/// One turn of the agent loop.
#[derive(Debug, Clone)]
pub enum AgentTurn {
    /// The agent finished reasoning and produced its final answer.
    Answer(String),
    /// The agent wants a tool executed before it continues.
    ToolCall(ToolCallRequest),
}

/// Gateway to the external agent/planner service.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Open a session advertising exactly the given tools.
    ///
    /// The correlation id is attached to every request the session makes
    /// on the wire.
    async fn create_session(
        &self,
        tools: &[ToolDescriptor],
        correlation_id: &str,
    ) -> Result<Box<dyn AgentSession>, GatewayError>;
}

/// An active agent session.
///
/// Implementations must tolerate a repeated `send`/`send_tool_result`
/// after a [`GatewayError::StreamEnded`] failure — the orchestrator
/// re-issues the same call during its bounded retry.
#[async_trait]
pub trait AgentSession: Send {
    /// Send the user prompt and receive the first turn.
    async fn send(&mut self, prompt: &str) -> Result<AgentTurn, GatewayError>;

    /// Fold a tool outcome back into the session and receive the next
    /// turn. `is_error` marks denials, missing parameters, and backend
    /// failures so the model can self-correct.
    async fn send_tool_result(
        &mut self,
        tool_name: &str,
        output: &str,
        is_error: bool,
    ) -> Result<AgentTurn, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ended_signature() {
        assert!(GatewayError::StreamEnded("eof mid-frame".into()).is_stream_ended());
        assert!(!GatewayError::Timeout.is_stream_ended());
        assert!(!GatewayError::RequestFailed("500".into()).is_stream_ended());
    }
}
