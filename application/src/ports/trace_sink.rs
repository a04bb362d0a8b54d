//! Port for structured request tracing.
//!
//! Separate from `tracing`-based operational logs: tracing carries
//! human-readable diagnostics, while this port records machine-readable
//! per-request events (guard verdicts, tool calls, outcomes), each tagged
//! with the request's correlation id.

use serde_json::Value;

/// A structured trace event.
pub struct TraceEvent {
    /// Event type identifier (e.g., "tool_call", "guard_blocked").
    pub event_type: &'static str,
    /// JSON payload with event-specific fields; always includes
    /// `correlation_id`.
    pub payload: Value,
}

impl TraceEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording trace events.
///
/// `record` is synchronous and non-fallible so tracing can never disturb
/// the request pipeline; implementations swallow their own I/O errors.
pub trait TraceSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: TraceEvent);
}

/// No-op sink for tests and when tracing is disabled.
pub struct NoTraceSink;

impl TraceSink for NoTraceSink {
    fn record(&self, _event: TraceEvent) {}
}
