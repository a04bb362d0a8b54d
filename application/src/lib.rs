//! Application layer for opsgate
//!
//! This crate contains the broker use case, port definitions, the intent
//! guard, and the correlation manager. It depends only on the domain
//! layer.

pub mod config;
pub mod correlation;
pub mod guard;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::BrokerParams;
pub use correlation::CorrelationManager;
pub use guard::IntentGuard;
pub use ports::{
    agent_gateway::{AgentGateway, AgentSession, AgentTurn, GatewayError},
    tool_router::ToolRouterPort,
    trace_sink::{NoTraceSink, TraceEvent, TraceSink},
};
pub use use_cases::run_broker::{
    BrokerRequest, BrokerResponse, DebugInfo, RunBrokerUseCase, ToolInventory,
};
