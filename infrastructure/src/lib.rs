//! Infrastructure layer for opsgate
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the regex prompt extractor, the execution router
//! with its backend clients and process supervisor, the HTTP agent
//! gateway, configuration file loading, and the JSONL trace sink.

pub mod agent;
pub mod backend;
pub mod config;
pub mod extract;
pub mod logging;

// Re-export commonly used types
pub use agent::gateway::HttpAgentGateway;
pub use backend::{
    error::{BackendError, Result},
    protocol::{JsonRpcRequest, JsonRpcResponse, LegacyCallRequest},
    router::{BackendTarget, ExecutionRouter},
    supervisor::{BackendCommand, ProcessSupervisor},
};
pub use config::{ConfigLoader, FileConfig};
pub use extract::PatternExtractor;
pub use logging::JsonlTraceSink;
