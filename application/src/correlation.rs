//! Correlation id derivation.
//!
//! Every inbound request gets exactly one correlation id, chosen by
//! precedence:
//!
//! 1. an inbound `x-correlation-id` header, verbatim;
//! 2. a structured id derived from deployment metadata
//!    (`{repo}__pr-{n}__run-{run}__actor-{actor}` plus an 8-hex-char
//!    prompt fingerprint for duplicate-request detection);
//! 3. a random opaque id under a fixed namespace tag.
//!
//! The structured form is deterministic: identical metadata and prompt
//! produce identical ids, which makes duplicate submissions visible in
//! traces. Only the fallback path differs across calls.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace tag for randomly generated ids.
const ID_NAMESPACE: &str = "opsgate";

/// Header carrying a caller-chosen correlation id.
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Derives the correlation id for one inbound request.
#[derive(Debug, Clone, Default)]
pub struct CorrelationManager;

impl CorrelationManager {
    pub fn new() -> Self {
        Self
    }

    /// Choose the correlation id for a request. Never fails; the random
    /// fallback covers degenerate metadata.
    pub fn get_or_create(
        &self,
        headers: &HashMap<String, String>,
        metadata: &HashMap<String, Value>,
        prompt: &str,
    ) -> String {
        if let Some(id) = header_value(headers) {
            return id.to_string();
        }

        if let Some(id) = structured_id(metadata, prompt) {
            return id;
        }

        format!("{}-{}", ID_NAMESPACE, Uuid::new_v4())
    }
}

/// Case-insensitive, non-empty lookup of the correlation header.
fn header_value(headers: &HashMap<String, String>) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(CORRELATION_HEADER))
        .map(|(_, value)| value.as_str())
        .filter(|v| !v.is_empty())
}

/// Structured id from deployment metadata, or `None` when any required
/// field is unavailable (which would render the id degenerate).
fn structured_id(metadata: &HashMap<String, Value>, prompt: &str) -> Option<String> {
    let repo = metadata_str(metadata, &["repository", "repo"])?;
    let run_id = metadata_string(metadata, &["run_id"])?;
    let actor = metadata_str(metadata, &["actor"])?;

    let mut id = repo.to_string();
    if let Some(pr) = metadata_u64(metadata, "pr_number") {
        id.push_str(&format!("__pr-{}", pr));
    }
    id.push_str(&format!("__run-{}__actor-{}", run_id, actor));
    id.push_str(&format!("-{}", fingerprint(prompt)));
    Some(id)
}

fn metadata_str<'a>(metadata: &'a HashMap<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        metadata
            .get(*key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    })
}

/// String form of a metadata value that may be a string or a number.
fn metadata_string(metadata: &HashMap<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match metadata.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn metadata_u64(metadata: &HashMap<String, Value>, key: &str) -> Option<u64> {
    let value = metadata.get(key)?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// First 8 hex chars of the prompt's SHA-256.
fn fingerprint(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment_metadata() -> HashMap<String, Value> {
        HashMap::from([
            ("repository".to_string(), json!("acme/platform")),
            ("run_id".to_string(), json!(4412)),
            ("actor".to_string(), json!("octocat")),
            ("pr_number".to_string(), json!(9)),
        ])
    }

    #[test]
    fn test_header_wins_verbatim() {
        let manager = CorrelationManager::new();
        let headers = HashMap::from([(
            "X-Correlation-Id".to_string(),
            "caller-chosen-id".to_string(),
        )]);
        let id = manager.get_or_create(&headers, &deployment_metadata(), "Analyze PR #9");
        assert_eq!(id, "caller-chosen-id");

        // Same input, same id
        let again = manager.get_or_create(&headers, &deployment_metadata(), "Analyze PR #9");
        assert_eq!(again, id);
    }

    #[test]
    fn test_structured_id_shape() {
        let manager = CorrelationManager::new();
        let id = manager.get_or_create(&HashMap::new(), &deployment_metadata(), "Analyze PR #9");
        assert!(
            id.starts_with("acme/platform__pr-9__run-4412__actor-octocat-"),
            "unexpected id: {}",
            id
        );
        // 8-hex-char prompt fingerprint
        let fp = id.rsplit('-').next().unwrap();
        assert_eq!(fp.len(), 8);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_structured_id_is_deterministic() {
        let manager = CorrelationManager::new();
        let a = manager.get_or_create(&HashMap::new(), &deployment_metadata(), "Analyze PR #9");
        let b = manager.get_or_create(&HashMap::new(), &deployment_metadata(), "Analyze PR #9");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_with_prompt() {
        let manager = CorrelationManager::new();
        let a = manager.get_or_create(&HashMap::new(), &deployment_metadata(), "Analyze PR #9");
        let b = manager.get_or_create(&HashMap::new(), &deployment_metadata(), "Summarize PR #9");
        assert_ne!(a, b);
    }

    #[test]
    fn test_pr_segment_omitted_without_pr_number() {
        let mut metadata = deployment_metadata();
        metadata.remove("pr_number");
        let manager = CorrelationManager::new();
        let id = manager.get_or_create(&HashMap::new(), &metadata, "Deploy stats please");
        assert!(id.starts_with("acme/platform__run-4412__actor-octocat-"));
        assert!(!id.contains("__pr-"));
    }

    #[test]
    fn test_random_fallback_differs_per_call() {
        let manager = CorrelationManager::new();
        // Missing actor → structured id would be degenerate
        let metadata = HashMap::from([("repository".to_string(), json!("acme/platform"))]);
        let a = manager.get_or_create(&HashMap::new(), &metadata, "hello");
        let b = manager.get_or_create(&HashMap::new(), &metadata, "hello");
        assert!(a.starts_with("opsgate-"));
        assert!(b.starts_with("opsgate-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_header_is_ignored() {
        let manager = CorrelationManager::new();
        let headers = HashMap::from([("x-correlation-id".to_string(), String::new())]);
        let id = manager.get_or_create(&headers, &deployment_metadata(), "Analyze PR #9");
        assert!(id.starts_with("acme/platform__"));
    }
}
