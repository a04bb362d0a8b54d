//! CLI entrypoint for opsgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection: pattern extractor, tier policy, parameter
//! resolver, process supervisor, execution router, and agent gateway.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use opsgate_application::{IntentGuard, RunBrokerUseCase, TraceSink};
use opsgate_domain::{ParameterResolver, PromptExtractor, Tier, TierPolicy};
use opsgate_infrastructure::{
    ConfigLoader, ExecutionRouter, HttpAgentGateway, JsonlTraceSink, PatternExtractor,
    ProcessSupervisor,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments for opsgate
#[derive(Parser, Debug)]
#[command(name = "opsgate")]
#[command(author, version, about = "Tiered tool-execution broker for LLM ops agents")]
#[command(long_about = r#"
Opsgate brokers tool-calling requests from an LLM agent to backend tool
services, enforcing a per-tier capability set regardless of what the
model asks for.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./opsgate.toml      Project-level config
3. ~/.config/opsgate/config.toml   Global config

Example:
  opsgate ask --tier user "List ECS clusters" \
      --account-id 500330120558 --region us-east-1 \
      --backend-url http://gateway.internal
  opsgate tools
"#)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    no_config: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Broker one request through the tiered pipeline
    Ask {
        /// The free-text request
        prompt: String,

        /// Trust tier for this call (user or admin)
        #[arg(long, default_value = "user")]
        tier: Tier,

        /// AWS account id injected into every backend call
        #[arg(long)]
        account_id: String,

        /// AWS region injected into every backend call
        #[arg(long)]
        region: String,

        /// Base URL of the legacy gateway / derived backends
        #[arg(long)]
        backend_url: String,

        /// Caller metadata as key=value (value parsed as JSON when possible)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,

        /// Extra headers as key=value (e.g. x-correlation-id=abc)
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,
    },
    /// Print the per-tier tool inventories
    Tools,
}

fn parse_pairs(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => bail!("expected KEY=VALUE, got '{}'", pair),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")?
    };

    // === Dependency Injection ===
    let extractor: Arc<dyn PromptExtractor> = Arc::new(PatternExtractor::new());
    let policy = Arc::new(TierPolicy::standard());
    let resolver = Arc::new(ParameterResolver::new(Arc::clone(&extractor)));
    let guard = IntentGuard::new(Arc::clone(&extractor), Arc::clone(&policy));

    let supervisor = Arc::new(
        ProcessSupervisor::new(config.backends.supervisor_commands())
            .with_request_timeout(config.backends.request_timeout())
            .with_warmup(config.backends.warmup()),
    );
    let router = Arc::new(
        ExecutionRouter::new(Arc::clone(&supervisor), config.backends.routing_targets())
            .with_timeouts(
                config.backends.request_timeout(),
                config.backends.legacy_timeout(),
            ),
    );
    let gateway = Arc::new(
        HttpAgentGateway::new(&config.agent.url)
            .with_timeout(Duration::from_secs(config.agent.timeout_secs)),
    );

    let mut use_case = RunBrokerUseCase::new(
        gateway,
        router,
        Arc::clone(&policy),
        resolver,
        guard,
    )
    .with_params(config.broker.to_params());

    if let Some(path) = &config.trace.path
        && let Some(sink) = JsonlTraceSink::new(path)
    {
        info!("trace log: {}", sink.path().display());
        let sink: Arc<dyn TraceSink> = Arc::new(sink);
        use_case = use_case.with_trace_sink(sink);
    }

    match cli.command {
        Command::Ask {
            prompt,
            tier,
            account_id,
            region,
            backend_url,
            metadata,
            headers,
        } => {
            let metadata: HashMap<String, serde_json::Value> = parse_pairs(&metadata)?
                .into_iter()
                .map(|(key, value)| {
                    // Numbers and structures may come as JSON; anything
                    // else is a plain string
                    let parsed = serde_json::from_str(&value)
                        .unwrap_or(serde_json::Value::String(value));
                    (key, parsed)
                })
                .collect();
            let headers: HashMap<String, String> = parse_pairs(&headers)?.into_iter().collect();

            let request = opsgate_application::BrokerRequest {
                prompt,
                account_id,
                region,
                backend_base_url: backend_url,
                metadata,
                headers,
            };

            info!(tier = %tier, "brokering request");
            let response = match tier {
                Tier::User => use_case.execute_user(request).await,
                Tier::Admin => use_case.execute_admin(request).await,
            };

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Tools => {
            let inventory = use_case.tool_inventory();
            println!("{}", serde_json::to_string_pretty(&inventory)?);
        }
    }

    Ok(())
}
