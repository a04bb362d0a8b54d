//! Per-family field resolution tables.
//!
//! The original system encoded which fields are metadata-wins versus
//! model-wins ad hoc per tool; this table makes the policy explicit and
//! testable. Two directions exist:
//!
//! - **Metadata-wins** — identity/ambient fields (repo, actor, run id for
//!   PR tools). Metadata identifies the tenant and session; model
//!   arguments are never consulted, and the prompt is only searched when
//!   metadata is absent.
//! - **Model-wins** — explicit in-turn targets (PR number, deployment
//!   repository, stack name, legacy tool name). The current utterance
//!   overrides ambient defaults, with metadata and then prompt patterns
//!   as fallbacks.
//!
//! `account_id`, `region` and `backend_url` never appear here: the
//! resolver injects them from the request's AWS context unconditionally.

use crate::tool::family::ToolFamily;

/// Which source wins when several can supply a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// metadata → prompt pattern (model arguments ignored)
    MetadataWins,
    /// model arguments → metadata → prompt pattern
    ModelWins,
}

/// Prompt-extracted value usable as a last-resort source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptField {
    PrNumber,
    StackName,
}

/// Resolution rule for one argument of one tool.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical key in the resolved arguments (and in model arguments).
    pub key: &'static str,
    /// Accepted metadata keys, in lookup order.
    pub metadata_keys: &'static [&'static str],
    pub precedence: Precedence,
    pub prompt_fallback: Option<PromptField>,
    pub required: bool,
}

const REPO_REQUIRED: FieldSpec = FieldSpec {
    key: "repo",
    metadata_keys: &["repository", "repo"],
    precedence: Precedence::MetadataWins,
    prompt_fallback: None,
    required: true,
};

const REPO_AMBIENT: FieldSpec = FieldSpec {
    key: "repo",
    metadata_keys: &["repository", "repo"],
    precedence: Precedence::MetadataWins,
    prompt_fallback: None,
    required: false,
};

const ACTOR: FieldSpec = FieldSpec {
    key: "actor",
    metadata_keys: &["actor"],
    precedence: Precedence::MetadataWins,
    prompt_fallback: None,
    required: false,
};

const RUN_ID_AMBIENT: FieldSpec = FieldSpec {
    key: "run_id",
    metadata_keys: &["run_id"],
    precedence: Precedence::MetadataWins,
    prompt_fallback: None,
    required: false,
};

const PR_NUMBER_REQUIRED: FieldSpec = FieldSpec {
    key: "pr_number",
    metadata_keys: &["pr_number"],
    precedence: Precedence::ModelWins,
    prompt_fallback: Some(PromptField::PrNumber),
    required: true,
};

const PR_NUMBER_AMBIENT: FieldSpec = FieldSpec {
    key: "pr_number",
    metadata_keys: &["pr_number"],
    precedence: Precedence::ModelWins,
    prompt_fallback: Some(PromptField::PrNumber),
    required: false,
};

const DIFF: FieldSpec = FieldSpec {
    key: "diff",
    metadata_keys: &[],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: true,
};

const CHANGED_FILES: FieldSpec = FieldSpec {
    key: "changed_files",
    metadata_keys: &[],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: true,
};

const DEPLOY_REPOSITORY: FieldSpec = FieldSpec {
    key: "repository",
    metadata_keys: &["repository", "repo"],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: true,
};

const DAYS: FieldSpec = FieldSpec {
    key: "days",
    metadata_keys: &[],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: false,
};

const DEPLOY_RUN_ID: FieldSpec = FieldSpec {
    key: "run_id",
    metadata_keys: &["run_id"],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: true,
};

const TEMPLATE_BODY: FieldSpec = FieldSpec {
    key: "template_body",
    metadata_keys: &[],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: true,
};

const STACK_NAME: FieldSpec = FieldSpec {
    key: "stack_name",
    metadata_keys: &["stack_name"],
    precedence: Precedence::ModelWins,
    prompt_fallback: Some(PromptField::StackName),
    required: true,
};

const GATEWAY_TOOL: FieldSpec = FieldSpec {
    key: "tool",
    metadata_keys: &[],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: true,
};

const GATEWAY_PARAMS: FieldSpec = FieldSpec {
    key: "params",
    metadata_keys: &[],
    precedence: Precedence::ModelWins,
    prompt_fallback: None,
    required: false,
};

/// The field table for one tool, dispatched by exact name with a family
/// default for names the catalog does not pin down.
pub fn specs_for(tool_name: &str, family: ToolFamily) -> &'static [FieldSpec] {
    match family {
        ToolFamily::Pr => match tool_name {
            "pr_get_diff" => &[REPO_REQUIRED, ACTOR, RUN_ID_AMBIENT, PR_NUMBER_REQUIRED],
            "pr_summarize" => &[
                REPO_AMBIENT,
                ACTOR,
                RUN_ID_AMBIENT,
                PR_NUMBER_AMBIENT,
                DIFF,
                CHANGED_FILES,
            ],
            "pr_check_compliance" => {
                &[REPO_AMBIENT, ACTOR, RUN_ID_AMBIENT, PR_NUMBER_AMBIENT, DIFF]
            }
            _ => &[REPO_AMBIENT, ACTOR, RUN_ID_AMBIENT, PR_NUMBER_AMBIENT],
        },
        ToolFamily::Deploy => match tool_name {
            "deploy_get_run" => &[DEPLOY_REPOSITORY, DEPLOY_RUN_ID],
            _ => &[DEPLOY_REPOSITORY, DAYS],
        },
        ToolFamily::Pricing => match tool_name {
            "pricingcalc_stack_cost" => &[STACK_NAME],
            _ => &[TEMPLATE_BODY],
        },
        ToolFamily::EcsGateway | ToolFamily::IacGateway => &[GATEWAY_TOOL, GATEWAY_PARAMS],
    }
}
