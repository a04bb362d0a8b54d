//! Tool domain entities — catalog, call requests, resolved arguments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Definition of a tool the broker can advertise to the agent loop.
///
/// The tool's behavior is opaque to the broker; the descriptor only
/// carries what the agent needs to propose a call and what the debug
/// endpoint reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "pr_get_diff")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter specifications
    pub parameters: Vec<ToolParameter>,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether the agent must supply this parameter
    pub required: bool,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
        }
    }
}

/// The static catalog of broker tools.
///
/// Order is stable (insertion order) so advertised tool lists and the
/// debug endpoint report deterministically.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The full broker catalog: PR analysis, deployment metrics, pricing,
    /// and the two legacy gateway passthroughs.
    pub fn standard() -> Self {
        Self::new()
            .register(
                ToolDescriptor::new("pr_get_diff", "Fetch the unified diff of a pull request")
                    .with_parameter(ToolParameter::new("pr_number", "Pull request number", true)),
            )
            .register(
                ToolDescriptor::new("pr_summarize", "Summarize a pull request diff")
                    .with_parameter(ToolParameter::new("diff", "Unified diff text", true))
                    .with_parameter(ToolParameter::new(
                        "changed_files",
                        "List of changed file paths",
                        true,
                    )),
            )
            .register(
                ToolDescriptor::new(
                    "pr_check_compliance",
                    "Check a pull request diff against compliance rules",
                )
                .with_parameter(ToolParameter::new("diff", "Unified diff text", true)),
            )
            .register(
                ToolDescriptor::new(
                    "deploy_query_metrics",
                    "Query deployment metrics for a repository",
                )
                .with_parameter(ToolParameter::new("repository", "Repository to query", true))
                .with_parameter(ToolParameter::new("days", "Lookback window in days", false)),
            )
            .register(
                ToolDescriptor::new("deploy_get_run", "Fetch a single deployment run")
                    .with_parameter(ToolParameter::new("repository", "Repository to query", true))
                    .with_parameter(ToolParameter::new("run_id", "Deployment run id", true)),
            )
            .register(
                ToolDescriptor::new(
                    "pricingcalc_estimate",
                    "Estimate monthly cost of a CloudFormation template",
                )
                .with_parameter(ToolParameter::new(
                    "template_body",
                    "CloudFormation template body",
                    true,
                )),
            )
            .register(
                ToolDescriptor::new(
                    "pricingcalc_stack_cost",
                    "Estimate monthly cost of an existing stack",
                )
                .with_parameter(ToolParameter::new("stack_name", "Deployed stack name", true)),
            )
            .register(
                ToolDescriptor::new("ecs_call_tool", "Run an ECS query through the legacy gateway")
                    .with_parameter(ToolParameter::new("tool", "Gateway tool name", true))
                    .with_parameter(ToolParameter::new("params", "Gateway tool parameters", false)),
            )
            .register(
                ToolDescriptor::new(
                    "iac_call_tool",
                    "Run an IaC validation through the legacy gateway",
                )
                .with_parameter(ToolParameter::new("tool", "Gateway tool name", true))
                .with_parameter(ToolParameter::new("params", "Gateway tool parameters", false)),
            )
    }
}

/// A tool call proposed by the agent loop.
///
/// `model_arguments` is untrusted input: it participates in parameter
/// resolution only where the per-family field table says it may.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool the agent wants to run
    pub tool_name: String,
    /// Arguments proposed by the model
    #[serde(default)]
    pub model_arguments: HashMap<String, serde_json::Value>,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            model_arguments: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.model_arguments.insert(key.into(), value.into());
        self
    }
}

/// Final arguments for a backend call, produced by the parameter resolver.
///
/// Always carries `account_id`, `region` and `backend_url` copied from the
/// request's AWS context; null-valued optional fields are dropped during
/// resolution, so every stored value is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedArguments {
    values: HashMap<String, serde_json::Value>,
}

impl ResolvedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(|v| v.as_u64())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }

    /// The arguments as a JSON object, as sent in the backend envelope.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
