//! File-backed configuration model.
//!
//! Mirrors the `opsgate.toml` layout:
//!
//! ```toml
//! [broker]
//! max_tool_turns = 10
//!
//! [agent]
//! url = "http://127.0.0.1:8787"
//!
//! [backends]
//! request_timeout_secs = 45
//! legacy_timeout_secs = 10
//!
//! [backends.pr]
//! command = "python3"
//! args = ["-m", "pr_backend.server"]
//! cwd = "/opt/backends/pr"
//!
//! [backends.metrics]
//! url = "http://metrics.internal/rpc"
//!
//! [trace]
//! path = "/var/log/opsgate/trace.jsonl"
//! ```
//!
//! A backend with a `command` is spawned and supervised; one with a `url`
//! is called over HTTP; one with neither is addressed per request under
//! the caller's backend base URL.

use crate::backend::router::BackendTarget;
use crate::backend::supervisor::BackendCommand;
use opsgate_application::BrokerParams;
use opsgate_domain::BackendId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub broker: FileBrokerConfig,
    pub agent: FileAgentConfig,
    pub backends: FileBackendsConfig,
    pub trace: FileTraceConfig,
}

/// `[broker]` — orchestrator loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBrokerConfig {
    pub max_tool_turns: usize,
    pub stream_retry_limit: usize,
    pub stream_retry_backoff_ms: u64,
    pub curated_answer_max_chars: usize,
}

impl Default for FileBrokerConfig {
    fn default() -> Self {
        let params = BrokerParams::default();
        Self {
            max_tool_turns: params.max_tool_turns,
            stream_retry_limit: params.stream_retry_limit,
            stream_retry_backoff_ms: params.stream_retry_backoff.as_millis() as u64,
            curated_answer_max_chars: params.curated_answer_max_chars,
        }
    }
}

impl FileBrokerConfig {
    pub fn to_params(&self) -> BrokerParams {
        BrokerParams::default()
            .with_max_tool_turns(self.max_tool_turns)
            .with_stream_retry_limit(self.stream_retry_limit)
            .with_stream_retry_backoff(Duration::from_millis(self.stream_retry_backoff_ms))
            .with_curated_answer_max_chars(self.curated_answer_max_chars)
    }
}

/// `[agent]` — the planner service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8787".to_string(),
            timeout_secs: 120,
        }
    }
}

/// `[backends]` — timeouts and per-backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendsConfig {
    pub request_timeout_secs: u64,
    /// Legacy gateway calls are budgeted shorter.
    pub legacy_timeout_secs: u64,
    pub warmup_ms: u64,
    pub pr: FileBackendEndpoint,
    pub metrics: FileBackendEndpoint,
    pub pricing: FileBackendEndpoint,
}

impl Default for FileBackendsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 45,
            legacy_timeout_secs: 10,
            warmup_ms: 300,
            pr: FileBackendEndpoint::default(),
            metrics: FileBackendEndpoint::default(),
            pricing: FileBackendEndpoint::default(),
        }
    }
}

/// One backend endpoint: subprocess (`command`) or remote (`url`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendEndpoint {
    pub url: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub env: HashMap<String, String>,
}

impl FileBackendEndpoint {
    fn to_command(&self) -> Option<BackendCommand> {
        let program = self.command.as_ref()?;
        let mut command = BackendCommand::new(program).with_args(self.args.clone());
        if let Some(cwd) = &self.cwd {
            command = command.with_cwd(cwd);
        }
        for (key, value) in &self.env {
            command = command.with_env(key, value);
        }
        Some(command)
    }

    fn to_target(&self, backend: BackendId) -> BackendTarget {
        if self.command.is_some() {
            BackendTarget::Supervised {
                name: backend.as_str().to_string(),
            }
        } else {
            BackendTarget::Http {
                url: self.url.clone(),
            }
        }
    }
}

impl FileBackendsConfig {
    fn endpoints(&self) -> [(BackendId, &FileBackendEndpoint); 3] {
        [
            (BackendId::Pr, &self.pr),
            (BackendId::Metrics, &self.metrics),
            (BackendId::Pricing, &self.pricing),
        ]
    }

    /// Commands for the process supervisor (subprocess backends only).
    pub fn supervisor_commands(&self) -> HashMap<String, BackendCommand> {
        self.endpoints()
            .into_iter()
            .filter_map(|(id, endpoint)| {
                endpoint
                    .to_command()
                    .map(|command| (id.as_str().to_string(), command))
            })
            .collect()
    }

    /// The routing table for the execution router.
    pub fn routing_targets(&self) -> Vec<(BackendId, BackendTarget)> {
        self.endpoints()
            .into_iter()
            .map(|(id, endpoint)| (id, endpoint.to_target(id)))
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn legacy_timeout(&self) -> Duration {
        Duration::from_secs(self.legacy_timeout_secs)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// `[trace]` — optional JSONL trace log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTraceConfig {
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert_eq!(config.broker.max_tool_turns, 10);
        assert_eq!(config.backends.request_timeout_secs, 45);
        assert!(config.backends.legacy_timeout_secs < config.backends.request_timeout_secs);
        assert!(config.trace.path.is_none());
    }

    #[test]
    fn test_subprocess_endpoint_becomes_supervised_target() {
        let toml = r#"
            [backends.pr]
            command = "python3"
            args = ["-m", "pr_backend.server"]
            cwd = "/opt/backends/pr"
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();

        let commands = config.backends.supervisor_commands();
        assert_eq!(commands.len(), 1);
        let pr = &commands["pr"];
        assert_eq!(pr.program, "python3");
        assert_eq!(pr.args, vec!["-m", "pr_backend.server"]);

        let targets = config.backends.routing_targets();
        let (_, pr_target) = targets.iter().find(|(id, _)| *id == BackendId::Pr).unwrap();
        assert!(matches!(pr_target, BackendTarget::Supervised { name } if name == "pr"));
    }

    #[test]
    fn test_url_endpoint_becomes_http_target() {
        let toml = r#"
            [backends.metrics]
            url = "http://metrics.internal/rpc"
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        let targets = config.backends.routing_targets();
        let (_, target) = targets
            .iter()
            .find(|(id, _)| *id == BackendId::Metrics)
            .unwrap();
        assert!(
            matches!(target, BackendTarget::Http { url: Some(url) } if url == "http://metrics.internal/rpc")
        );
    }

    #[test]
    fn test_unconfigured_endpoint_derives_per_request() {
        let config = FileConfig::default();
        let targets = config.backends.routing_targets();
        assert!(
            targets
                .iter()
                .all(|(_, t)| matches!(t, BackendTarget::Http { url: None }))
        );
    }

    #[test]
    fn test_broker_section_to_params() {
        let toml = r#"
            [broker]
            max_tool_turns = 4
            stream_retry_backoff_ms = 50
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        let params = config.broker.to_params();
        assert_eq!(params.max_tool_turns, 4);
        assert_eq!(params.stream_retry_backoff, Duration::from_millis(50));
        // Unspecified keys keep their defaults
        assert_eq!(params.stream_retry_limit, 2);
    }
}
