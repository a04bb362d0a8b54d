//! Configuration loading.

pub mod file_config;
pub mod loader;

pub use file_config::{
    FileAgentConfig, FileBackendEndpoint, FileBackendsConfig, FileBrokerConfig, FileConfig,
    FileTraceConfig,
};
pub use loader::ConfigLoader;
