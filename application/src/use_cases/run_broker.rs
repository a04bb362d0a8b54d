//! Run Broker use case.
//!
//! The top-level control flow for one inbound request:
//!
//! 1. derive the correlation id (header > structured metadata > random)
//! 2. run the intent guard — a blocked verdict returns immediately
//! 3. open an agent session advertising the tier's allowed tools
//! 4. for each proposed tool call: firewall → resolver → router, folding
//!    the outcome back into the session as an error-flagged tool result
//!    when it is a rejection
//! 5. curate the final answer and attach debug info
//!
//! Expected rejections (denied tool, denied capability, missing params)
//! are successful structured responses; only an unexpected pipeline
//! failure produces the generic `INTERNAL_ERROR` body, and nothing from
//! the underlying error reaches the caller.

use crate::config::BrokerParams;
use crate::correlation::CorrelationManager;
use crate::guard::IntentGuard;
use crate::ports::agent_gateway::{AgentGateway, AgentSession, AgentTurn, GatewayError};
use crate::ports::tool_router::ToolRouterPort;
use crate::ports::trace_sink::{NoTraceSink, TraceEvent, TraceSink};
use opsgate_domain::{
    AwsContext, ErrorType, GuardVerdict, ParameterResolver, RequestContext, Tier, TierPolicy,
    ToolCallRequest, ToolOutcome, truncate,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One inbound broker call, as received by either entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerRequest {
    pub prompt: String,
    pub account_id: String,
    pub region: String,
    pub backend_base_url: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Debug block attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugInfo {
    pub tier: Tier,
    pub correlation_id: String,
    /// Number of tools advertised to the agent for this tier.
    pub tools_advertised: usize,
    pub elapsed_ms: u64,
}

/// The broker's answer. Rejections are carried in `error_type` with a
/// human-readable `answer`; they are not transport-level failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerResponse {
    pub answer: String,
    pub curated_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    /// Echoed on the response for the header contract.
    pub correlation_id: String,
    pub debug: DebugInfo,
}

/// Per-tier tool listing for the debug/introspection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInventory {
    pub user_tools: Vec<String>,
    pub admin_tools: Vec<String>,
    pub user_count: usize,
    pub admin_count: usize,
}

/// Use case for brokering one request through the tiered pipeline.
pub struct RunBrokerUseCase<G: AgentGateway + 'static, R: ToolRouterPort + 'static> {
    gateway: Arc<G>,
    router: Arc<R>,
    policy: Arc<TierPolicy>,
    resolver: Arc<ParameterResolver>,
    guard: IntentGuard,
    correlation: CorrelationManager,
    trace: Arc<dyn TraceSink>,
    params: BrokerParams,
}

impl<G: AgentGateway + 'static, R: ToolRouterPort + 'static> RunBrokerUseCase<G, R> {
    pub fn new(
        gateway: Arc<G>,
        router: Arc<R>,
        policy: Arc<TierPolicy>,
        resolver: Arc<ParameterResolver>,
        guard: IntentGuard,
    ) -> Self {
        Self {
            gateway,
            router,
            policy,
            resolver,
            guard,
            correlation: CorrelationManager::new(),
            trace: Arc::new(NoTraceSink),
            params: BrokerParams::default(),
        }
    }

    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_params(mut self, params: BrokerParams) -> Self {
        self.params = params;
        self
    }

    /// Restricted entry point.
    pub async fn execute_user(&self, request: BrokerRequest) -> BrokerResponse {
        self.execute(request, Tier::User).await
    }

    /// Full entry point.
    pub async fn execute_admin(&self, request: BrokerRequest) -> BrokerResponse {
        self.execute(request, Tier::Admin).await
    }

    /// Tool name lists per tier, for operational verification that tier
    /// separation holds.
    pub fn tool_inventory(&self) -> ToolInventory {
        let user_tools = self.policy.allowed_tools(Tier::User);
        let admin_tools = self.policy.allowed_tools(Tier::Admin);
        ToolInventory {
            user_count: user_tools.len(),
            admin_count: admin_tools.len(),
            user_tools,
            admin_tools,
        }
    }

    async fn execute(&self, request: BrokerRequest, tier: Tier) -> BrokerResponse {
        let started = Instant::now();

        let correlation_id =
            self.correlation
                .get_or_create(&request.headers, &request.metadata, &request.prompt);

        let ctx = RequestContext::new(
            tier,
            request.prompt,
            request.metadata,
            AwsContext {
                account_id: request.account_id,
                region: request.region,
                backend_base_url: request.backend_base_url,
            },
        );
        ctx.set_correlation_id(&correlation_id);

        let tools_advertised = self.policy.allowed_tools(tier).len();
        info!(%correlation_id, %tier, "broker request received");
        self.trace.record(TraceEvent::new(
            "request_received",
            json!({
                "correlation_id": correlation_id,
                "tier": tier,
                "prompt_chars": ctx.prompt().len(),
            }),
        ));

        if let GuardVerdict::Blocked(block) = self.guard.check(&ctx) {
            self.trace.record(TraceEvent::new(
                "guard_blocked",
                json!({
                    "correlation_id": correlation_id,
                    "error_type": block.error_type,
                    "missing_fields": block.missing_fields,
                }),
            ));
            return self.respond(
                block.message.clone(),
                Some(block.error_type),
                tier,
                correlation_id,
                tools_advertised,
                started,
            );
        }

        match self.run_agent_loop(&ctx, &correlation_id).await {
            Ok(answer) => {
                self.respond(answer, None, tier, correlation_id, tools_advertised, started)
            }
            Err(e) => {
                // The gateway error may carry transport detail; log it for
                // operators but keep the caller-facing body generic.
                warn!(%correlation_id, error = %e, "broker pipeline failed");
                self.trace.record(TraceEvent::new(
                    "request_failed",
                    json!({ "correlation_id": correlation_id }),
                ));
                self.respond(
                    "The request could not be completed due to an internal error.".to_string(),
                    Some(ErrorType::InternalError),
                    tier,
                    correlation_id,
                    tools_advertised,
                    started,
                )
            }
        }
    }

    fn respond(
        &self,
        answer: String,
        error_type: Option<ErrorType>,
        tier: Tier,
        correlation_id: String,
        tools_advertised: usize,
        started: Instant,
    ) -> BrokerResponse {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.trace.record(TraceEvent::new(
            "request_completed",
            json!({
                "correlation_id": correlation_id,
                "error_type": error_type,
                "elapsed_ms": elapsed_ms,
            }),
        ));
        BrokerResponse {
            curated_answer: curate_answer(&answer, self.params.curated_answer_max_chars),
            answer,
            error_type,
            correlation_id: correlation_id.clone(),
            debug: DebugInfo {
                tier,
                correlation_id,
                tools_advertised,
                elapsed_ms,
            },
        }
    }

    /// The propose-tool → await-result → continue loop. Tool calls run
    /// strictly sequentially, in the order the agent proposes them.
    async fn run_agent_loop(
        &self,
        ctx: &RequestContext,
        correlation_id: &str,
    ) -> Result<String, GatewayError> {
        let tools: Vec<_> = self
            .policy
            .catalog()
            .all()
            .filter(|t| self.policy.is_allowed(&t.name, ctx.tier()))
            .cloned()
            .collect();

        let mut session = self.gateway.create_session(&tools, correlation_id).await?;
        let mut turn = self.send_with_retry(session.as_mut(), ctx.prompt()).await?;
        let mut turn_count = 0;

        loop {
            match turn {
                AgentTurn::Answer(text) => return Ok(text),
                AgentTurn::ToolCall(call) => {
                    turn_count += 1;
                    if turn_count > self.params.max_tool_turns {
                        warn!(%correlation_id, "tool turn limit reached");
                        return Ok(format!(
                            "Stopped after {} tool calls without reaching a final answer.",
                            self.params.max_tool_turns
                        ));
                    }

                    let outcome = self.route_call(&call, ctx, correlation_id).await;
                    let is_error = !outcome.is_ok();
                    let output = outcome.text_for_agent();
                    self.trace.record(TraceEvent::new(
                        "tool_outcome",
                        json!({
                            "correlation_id": correlation_id,
                            "tool": call.tool_name,
                            "error_type": outcome.error_type(),
                            "output_chars": output.len(),
                        }),
                    ));

                    turn = self
                        .tool_result_with_retry(
                            session.as_mut(),
                            &call.tool_name,
                            &output,
                            is_error,
                        )
                        .await?;
                }
            }
        }
    }

    /// Firewall → resolver → router for one proposed call. The firewall
    /// runs first: a denied tool gets no resolution work and no backend
    /// I/O.
    async fn route_call(
        &self,
        call: &ToolCallRequest,
        ctx: &RequestContext,
        correlation_id: &str,
    ) -> ToolOutcome {
        if !self.policy.is_allowed(&call.tool_name, ctx.tier()) {
            warn!(%correlation_id, tool = %call.tool_name, tier = %ctx.tier(), "firewall denied tool");
            return self.policy.denied(&call.tool_name, ctx.tier());
        }

        let resolved = match self.resolver.resolve(&call.tool_name, &call.model_arguments, ctx) {
            Ok(resolved) => resolved,
            Err(missing) => {
                debug!(%correlation_id, tool = %call.tool_name, missing = ?missing.missing, "unresolved parameters");
                return ToolOutcome::MissingParams {
                    tool_name: missing.tool_name,
                    missing: missing.missing,
                };
            }
        };

        debug!(%correlation_id, tool = %call.tool_name, "dispatching resolved call");
        self.router
            .dispatch(&call.tool_name, &resolved, correlation_id)
            .await
    }

    /// Send the prompt, retrying only the stream-ended-prematurely
    /// signature with a fixed backoff. Tool outcomes and other gateway
    /// errors are never retried.
    async fn send_with_retry(
        &self,
        session: &mut dyn AgentSession,
        prompt: &str,
    ) -> Result<AgentTurn, GatewayError> {
        let mut attempts = 0;
        loop {
            match session.send(prompt).await {
                Err(e) if e.is_stream_ended() && attempts < self.params.stream_retry_limit => {
                    attempts += 1;
                    warn!(attempt = attempts, "agent stream ended prematurely, retrying");
                    tokio::time::sleep(self.params.stream_retry_backoff).await;
                }
                other => return other,
            }
        }
    }

    /// As [`send_with_retry`](Self::send_with_retry), for tool results.
    async fn tool_result_with_retry(
        &self,
        session: &mut dyn AgentSession,
        tool_name: &str,
        output: &str,
        is_error: bool,
    ) -> Result<AgentTurn, GatewayError> {
        let mut attempts = 0;
        loop {
            match session.send_tool_result(tool_name, output, is_error).await {
                Err(e) if e.is_stream_ended() && attempts < self.params.stream_retry_limit => {
                    attempts += 1;
                    warn!(attempt = attempts, "agent stream ended prematurely, retrying");
                    tokio::time::sleep(self.params.stream_retry_backoff).await;
                }
                other => return other,
            }
        }
    }
}

/// Curate the raw agent answer for display: drop tool-chatter lines,
/// collapse blank runs, and bound the length.
fn curate_answer(answer: &str, max_chars: usize) -> String {
    let mut lines = Vec::new();
    let mut blank_run = 0;
    for line in answer.lines() {
        let trimmed = line.trim_end();
        // Interleaved loop narration the model sometimes emits
        if trimmed.starts_with("Thought:") || trimmed.starts_with("Calling tool") {
            continue;
        }
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(trimmed);
    }
    truncate(lines.join("\n").trim(), max_chars)
}
