//! Per-request context.
//!
//! [`RequestContext`] aggregates everything the pipeline needs about one
//! inbound call: the tier, the free-text prompt, the caller-supplied
//! metadata (authoritative), and the AWS context the resolver injects into
//! every backend call. It is created once, owned by its request, and
//! read-only afterwards — except the correlation id, which is set exactly
//! once with first-writer-wins semantics.

use crate::policy::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Trusted infrastructure context supplied by the caller, never by the
/// model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsContext {
    pub account_id: String,
    pub region: String,
    /// Base URL of the legacy gateway and other remote backends.
    pub backend_base_url: String,
}

/// Aggregate state for one inbound broker call.
#[derive(Debug)]
pub struct RequestContext {
    tier: Tier,
    prompt: String,
    metadata: HashMap<String, serde_json::Value>,
    aws: AwsContext,
    correlation_id: OnceLock<String>,
}

impl RequestContext {
    pub fn new(
        tier: Tier,
        prompt: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
        aws: AwsContext,
    ) -> Self {
        Self {
            tier,
            prompt: prompt.into(),
            metadata,
            aws,
            correlation_id: OnceLock::new(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn aws(&self) -> &AwsContext {
        &self.aws
    }

    /// Set the correlation id. The first writer wins; later calls return
    /// `false` and leave the id unchanged.
    pub fn set_correlation_id(&self, id: impl Into<String>) -> bool {
        self.correlation_id.set(id.into()).is_ok()
    }

    /// The correlation id, if one has been assigned.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.get().map(|s| s.as_str())
    }

    /// Metadata value as a non-empty string, looked up under the first
    /// matching key.
    pub fn metadata_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            self.metadata
                .get(*key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
        })
    }

    /// Metadata value as an unsigned integer, accepting both JSON numbers
    /// and numeric strings (callers serialize run/PR numbers both ways).
    pub fn metadata_u64(&self, keys: &[&str]) -> Option<u64> {
        keys.iter().find_map(|key| {
            let value = self.metadata.get(*key)?;
            value
                .as_u64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(metadata: HashMap<String, serde_json::Value>) -> RequestContext {
        RequestContext::new(
            Tier::User,
            "List ECS clusters",
            metadata,
            AwsContext {
                account_id: "500330120558".to_string(),
                region: "us-east-1".to_string(),
                backend_base_url: "http://gateway.internal".to_string(),
            },
        )
    }

    #[test]
    fn test_correlation_id_first_writer_wins() {
        let ctx = context(HashMap::new());
        assert!(ctx.correlation_id().is_none());
        assert!(ctx.set_correlation_id("corr-1"));
        assert!(!ctx.set_correlation_id("corr-2"));
        assert_eq!(ctx.correlation_id(), Some("corr-1"));
    }

    #[test]
    fn test_metadata_str_key_aliases() {
        let mut metadata = HashMap::new();
        metadata.insert("repo".to_string(), json!("acme/platform"));
        let ctx = context(metadata);

        assert_eq!(
            ctx.metadata_str(&["repository", "repo"]),
            Some("acme/platform")
        );
        assert!(ctx.metadata_str(&["actor"]).is_none());
    }

    #[test]
    fn test_metadata_str_ignores_empty() {
        let mut metadata = HashMap::new();
        metadata.insert("repository".to_string(), json!(""));
        let ctx = context(metadata);
        assert!(ctx.metadata_str(&["repository", "repo"]).is_none());
    }

    #[test]
    fn test_metadata_u64_accepts_numbers_and_strings() {
        let mut metadata = HashMap::new();
        metadata.insert("pr_number".to_string(), json!(3));
        metadata.insert("run_id".to_string(), json!("4412"));
        let ctx = context(metadata);

        assert_eq!(ctx.metadata_u64(&["pr_number"]), Some(3));
        assert_eq!(ctx.metadata_u64(&["run_id"]), Some(4412));
        assert_eq!(ctx.metadata_u64(&["build_id"]), None);
    }
}
