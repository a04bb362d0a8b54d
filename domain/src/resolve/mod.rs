//! Parameter resolution.
//!
//! [`ParameterResolver::resolve`] merges untrusted model arguments with
//! trusted caller metadata under the per-tool field tables in [`tables`],
//! then injects the AWS context keys on top. It is a pure function of its
//! three inputs; missing required fields come back as an explicit
//! [`MissingParams`] value rather than an exception-style error path.

pub mod tables;

use crate::extract::PromptExtractor;
use crate::request::RequestContext;
use crate::tool::entities::ResolvedArguments;
use crate::tool::family::ToolFamily;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tables::{FieldSpec, Precedence, PromptField};
use thiserror::Error;

/// One or more required fields could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required parameters for {tool_name}: {}", .missing.join(", "))]
pub struct MissingParams {
    pub tool_name: String,
    pub missing: Vec<String>,
}

/// Resolves final backend arguments for a tool call.
pub struct ParameterResolver {
    extractor: Arc<dyn PromptExtractor>,
}

/// A value counts as absent when it is null, an empty string, or an empty
/// list.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

impl ParameterResolver {
    pub fn new(extractor: Arc<dyn PromptExtractor>) -> Self {
        Self { extractor }
    }

    /// Resolve arguments for `tool_name`.
    ///
    /// Steps, per the field table for the tool:
    /// 1. fill each declared field from its winning source chain,
    /// 2. collect required fields that stayed absent,
    /// 3. inject `account_id`/`region`/`backend_url` from the request's
    ///    AWS context, overriding anything the model proposed.
    ///
    /// Null/empty optional fields are dropped from the result.
    pub fn resolve(
        &self,
        tool_name: &str,
        model_arguments: &HashMap<String, Value>,
        ctx: &RequestContext,
    ) -> Result<ResolvedArguments, MissingParams> {
        let mut resolved = ResolvedArguments::new();
        let mut missing = Vec::new();

        if let Some(family) = ToolFamily::of(tool_name) {
            for spec in tables::specs_for(tool_name, family) {
                match self.field_value(spec, model_arguments, ctx) {
                    Some(value) => resolved.insert(spec.key, value),
                    None if spec.required => missing.push(spec.key.to_string()),
                    None => {}
                }
            }
        }

        if !missing.is_empty() {
            return Err(MissingParams {
                tool_name: tool_name.to_string(),
                missing,
            });
        }

        let aws = ctx.aws();
        resolved.insert("account_id", Value::String(aws.account_id.clone()));
        resolved.insert("region", Value::String(aws.region.clone()));
        resolved.insert("backend_url", Value::String(aws.backend_base_url.clone()));

        Ok(resolved)
    }

    /// Pick the value for one field following its precedence direction.
    fn field_value(
        &self,
        spec: &FieldSpec,
        model_arguments: &HashMap<String, Value>,
        ctx: &RequestContext,
    ) -> Option<Value> {
        let from_model = || {
            model_arguments
                .get(spec.key)
                .filter(|v| is_present(v))
                .cloned()
        };
        let from_metadata = || {
            spec.metadata_keys.iter().find_map(|key| {
                ctx.metadata()
                    .get(*key)
                    .filter(|v| is_present(v))
                    .cloned()
            })
        };
        let from_prompt = || match spec.prompt_fallback? {
            PromptField::PrNumber => self.extractor.pr_number(ctx.prompt()).map(Value::from),
            PromptField::StackName => self.extractor.stack_name(ctx.prompt()).map(Value::from),
        };

        match spec.precedence {
            // Identity fields: the model never gets a say.
            Precedence::MetadataWins => from_metadata().or_else(from_prompt),
            Precedence::ModelWins => from_model().or_else(from_metadata).or_else(from_prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::policy::Tier;
    use crate::request::AwsContext;
    use serde_json::json;

    /// Fixed-answer extractor; keeps resolver tests independent of the
    /// infrastructure pattern implementation.
    struct StubExtractor {
        pr_number: Option<u64>,
        stack_name: Option<String>,
    }

    impl PromptExtractor for StubExtractor {
        fn intent(&self, _prompt: &str) -> Intent {
            Intent::General
        }
        fn pr_number(&self, _prompt: &str) -> Option<u64> {
            self.pr_number
        }
        fn stack_name(&self, _prompt: &str) -> Option<String> {
            self.stack_name.clone()
        }
        fn mentions_existing_stack(&self, _prompt: &str) -> bool {
            self.stack_name.is_some()
        }
    }

    fn resolver() -> ParameterResolver {
        ParameterResolver::new(Arc::new(StubExtractor {
            pr_number: None,
            stack_name: None,
        }))
    }

    fn resolver_with_prompt(pr: Option<u64>, stack: Option<&str>) -> ParameterResolver {
        ParameterResolver::new(Arc::new(StubExtractor {
            pr_number: pr,
            stack_name: stack.map(String::from),
        }))
    }

    fn context(metadata: &[(&str, Value)]) -> RequestContext {
        RequestContext::new(
            Tier::Admin,
            "prompt",
            metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            AwsContext {
                account_id: "500330120558".to_string(),
                region: "us-east-1".to_string(),
                backend_base_url: "http://gateway.internal".to_string(),
            },
        )
    }

    fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_aws_context_is_always_injected() {
        let ctx = context(&[]);
        let resolved = resolver()
            .resolve("ecs_call_tool", &args(&[("tool", json!("list_clusters"))]), &ctx)
            .unwrap();
        assert_eq!(resolved.get_str("account_id"), Some("500330120558"));
        assert_eq!(resolved.get_str("region"), Some("us-east-1"));
        assert_eq!(resolved.get_str("backend_url"), Some("http://gateway.internal"));
    }

    #[test]
    fn test_model_cannot_override_injected_context() {
        let ctx = context(&[]);
        let resolved = resolver()
            .resolve(
                "ecs_call_tool",
                &args(&[
                    ("tool", json!("list_clusters")),
                    ("account_id", json!("999")),
                    ("region", json!("eu-central-1")),
                ]),
                &ctx,
            )
            .unwrap();
        assert_eq!(resolved.get_str("account_id"), Some("500330120558"));
        assert_eq!(resolved.get_str("region"), Some("us-east-1"));
    }

    #[test]
    fn test_pr_number_model_beats_metadata() {
        let ctx = context(&[("repository", json!("acme/platform")), ("pr_number", json!(3))]);
        let resolved = resolver()
            .resolve("pr_get_diff", &args(&[("pr_number", json!(7))]), &ctx)
            .unwrap();
        assert_eq!(resolved.get_u64("pr_number"), Some(7));
    }

    #[test]
    fn test_pr_number_metadata_when_model_silent() {
        let ctx = context(&[("repository", json!("acme/platform")), ("pr_number", json!(3))]);
        let resolved = resolver().resolve("pr_get_diff", &args(&[]), &ctx).unwrap();
        assert_eq!(resolved.get_u64("pr_number"), Some(3));
    }

    #[test]
    fn test_pr_number_prompt_fallback_last() {
        let ctx = context(&[("repository", json!("acme/platform"))]);
        let resolved = resolver_with_prompt(Some(12), None)
            .resolve("pr_get_diff", &args(&[]), &ctx)
            .unwrap();
        assert_eq!(resolved.get_u64("pr_number"), Some(12));
    }

    #[test]
    fn test_pr_repo_ignores_model_arguments() {
        // Tenant identity: the model proposing a different repo must lose.
        let ctx = context(&[("repository", json!("acme/platform")), ("pr_number", json!(3))]);
        let resolved = resolver()
            .resolve("pr_get_diff", &args(&[("repo", json!("evil/fork"))]), &ctx)
            .unwrap();
        assert_eq!(resolved.get_str("repo"), Some("acme/platform"));
    }

    #[test]
    fn test_pr_actor_and_run_id_come_from_metadata() {
        let ctx = context(&[
            ("repository", json!("acme/platform")),
            ("actor", json!("octocat")),
            ("run_id", json!("4412")),
            ("pr_number", json!(9)),
        ]);
        let resolved = resolver().resolve("pr_get_diff", &args(&[]), &ctx).unwrap();
        assert_eq!(resolved.get_str("actor"), Some("octocat"));
        assert_eq!(resolved.get_str("run_id"), Some("4412"));
    }

    #[test]
    fn test_pr_summarize_missing_both_payload_fields() {
        let ctx = context(&[("repository", json!("acme/platform"))]);
        let err = resolver()
            .resolve("pr_summarize", &args(&[]), &ctx)
            .unwrap_err();
        assert_eq!(err.tool_name, "pr_summarize");
        assert_eq!(err.missing, vec!["diff", "changed_files"]);
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let ctx = context(&[("repository", json!("acme/platform"))]);
        let err = resolver()
            .resolve(
                "pr_summarize",
                &args(&[("diff", json!("")), ("changed_files", json!([]))]),
                &ctx,
            )
            .unwrap_err();
        assert_eq!(err.missing, vec!["diff", "changed_files"]);
    }

    #[test]
    fn test_deploy_repository_model_beats_metadata() {
        // Query target: "check acme/other" must beat the session default.
        let ctx = context(&[("repository", json!("acme/platform"))]);
        let resolved = resolver()
            .resolve(
                "deploy_query_metrics",
                &args(&[("repository", json!("acme/other"))]),
                &ctx,
            )
            .unwrap();
        assert_eq!(resolved.get_str("repository"), Some("acme/other"));
    }

    #[test]
    fn test_deploy_repository_metadata_fallback_with_alias() {
        let ctx = context(&[("repo", json!("acme/platform"))]);
        let resolved = resolver()
            .resolve("deploy_query_metrics", &args(&[]), &ctx)
            .unwrap();
        assert_eq!(resolved.get_str("repository"), Some("acme/platform"));
    }

    #[test]
    fn test_deploy_repository_required() {
        let ctx = context(&[]);
        let err = resolver()
            .resolve("deploy_query_metrics", &args(&[]), &ctx)
            .unwrap_err();
        assert_eq!(err.missing, vec!["repository"]);
    }

    #[test]
    fn test_optional_days_dropped_when_absent() {
        let ctx = context(&[("repository", json!("acme/platform"))]);
        let resolved = resolver()
            .resolve("deploy_query_metrics", &args(&[("days", json!(null))]), &ctx)
            .unwrap();
        assert!(!resolved.contains("days"));
    }

    #[test]
    fn test_stack_name_prompt_fallback() {
        let ctx = context(&[]);
        let resolved = resolver_with_prompt(None, Some("orders-prod"))
            .resolve("pricingcalc_stack_cost", &args(&[]), &ctx)
            .unwrap();
        assert_eq!(resolved.get_str("stack_name"), Some("orders-prod"));
    }

    #[test]
    fn test_stack_name_model_beats_prompt() {
        let ctx = context(&[]);
        let resolved = resolver_with_prompt(None, Some("orders-prod"))
            .resolve(
                "pricingcalc_stack_cost",
                &args(&[("stack_name", json!("billing-staging"))]),
                &ctx,
            )
            .unwrap();
        assert_eq!(resolved.get_str("stack_name"), Some("billing-staging"));
    }

    #[test]
    fn test_template_body_required_for_estimate() {
        let ctx = context(&[]);
        let err = resolver()
            .resolve("pricingcalc_estimate", &args(&[]), &ctx)
            .unwrap_err();
        assert_eq!(err.missing, vec!["template_body"]);
    }

    #[test]
    fn test_gateway_tool_required() {
        let ctx = context(&[]);
        let err = resolver().resolve("iac_call_tool", &args(&[]), &ctx).unwrap_err();
        assert_eq!(err.missing, vec!["tool"]);
    }

    #[test]
    fn test_unknown_tool_resolves_to_context_only() {
        let ctx = context(&[]);
        let resolved = resolver().resolve("mystery_tool", &args(&[]), &ctx).unwrap();
        assert_eq!(resolved.len(), 3);
        assert!(resolved.contains("account_id"));
    }
}
