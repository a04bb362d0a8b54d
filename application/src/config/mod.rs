//! Broker parameters — orchestrator loop control.
//!
//! [`BrokerParams`] groups the static parameters that control the agent
//! loop in [`RunBrokerUseCase`](crate::use_cases::run_broker::RunBrokerUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator loop control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerParams {
    /// Maximum tool calls the agent may propose in one request.
    pub max_tool_turns: usize,
    /// Retries for the stream-ended-prematurely gateway failure.
    pub stream_retry_limit: usize,
    /// Fixed backoff between stream retries.
    pub stream_retry_backoff: Duration,
    /// Byte budget for the curated answer.
    pub curated_answer_max_chars: usize,
}

impl Default for BrokerParams {
    fn default() -> Self {
        Self {
            max_tool_turns: 10,
            stream_retry_limit: 2,
            stream_retry_backoff: Duration::from_millis(500),
            curated_answer_max_chars: 4000,
        }
    }
}

impl BrokerParams {
    // ==================== Builder Methods ====================

    pub fn with_max_tool_turns(mut self, max: usize) -> Self {
        self.max_tool_turns = max;
        self
    }

    pub fn with_stream_retry_limit(mut self, limit: usize) -> Self {
        self.stream_retry_limit = limit;
        self
    }

    pub fn with_stream_retry_backoff(mut self, backoff: Duration) -> Self {
        self.stream_retry_backoff = backoff;
        self
    }

    pub fn with_curated_answer_max_chars(mut self, max: usize) -> Self {
        self.curated_answer_max_chars = max;
        self
    }
}
