//! Switchyard CLI
//!
//! Inspect backend health and chains, or run a single prompt through the
//! orchestrator. Credentials come from `GROQ_API_KEY`, `GOOGLE_API_KEY` and
//! `OPENAI_API_KEY`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use switchyard_core::{Availability, ExecutionRequest, TaskCategory};
use switchyard_runtime::{AdapterRegistry, EnvCredentials, Orchestrator, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "switchyard")]
#[command(about = "Route prompts across model providers with bounded fallback", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML configuration file (defaults to the built-in backend table)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show backend availability and counters
    Status {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the fallback chain for every task category
    Chains,

    /// Run one prompt
    Run {
        /// Task category (research, sentiment, valuation, thesis, critique, general)
        #[arg(short = 'C', long, default_value = "general")]
        category: TaskCategory,

        /// Maximum acceptable cost per 1k tokens
        #[arg(short, long)]
        budget: Option<f64>,

        /// Fallback attempts after the first (defaults to the config value)
        #[arg(short, long)]
        max_fallbacks: Option<u32>,

        /// Prompt text
        prompt: String,
    },

    /// Health-check every configured backend without sending a prompt
    Health,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig> {
    let config = match path {
        Some(path) => {
            let config = RuntimeConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::info!(path = %path.display(), backends = config.backends.len(), "Loaded configuration");
            config
        }
        None => {
            let config = RuntimeConfig::default();
            tracing::debug!(backends = config.backends.len(), "Using built-in backend table");
            config
        }
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    let default_max_fallbacks = config.default_max_fallbacks;
    let orchestrator = Orchestrator::from_config(config, &AdapterRegistry::with_defaults(), &EnvCredentials)
        .context("Failed to build orchestrator")?;

    match cli.command {
        Command::Status { json } => status(&orchestrator, json),
        Command::Chains => {
            chains(&orchestrator);
            Ok(())
        }
        Command::Run {
            category,
            budget,
            max_fallbacks,
            prompt,
        } => {
            let mut request = ExecutionRequest::new(prompt, category)
                .with_max_fallbacks(max_fallbacks.unwrap_or(default_max_fallbacks));
            if let Some(limit) = budget {
                request = request.with_budget_limit(limit);
            }
            run(&orchestrator, &request).await
        }
        Command::Health => {
            health(&orchestrator).await;
            Ok(())
        }
    }
}

fn status(orchestrator: &Orchestrator, json: bool) -> Result<()> {
    let status = orchestrator.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "{} of {} backends available\n",
        status.catalog.available_backends, status.catalog.total_backends
    );
    for (key, backend) in &status.catalog.backends {
        let state = match backend.availability {
            Availability::Available => "available".to_string(),
            Availability::Unconfigured => format!("unconfigured (set {})", backend.kind.credential_env()),
            Availability::Quarantined { since } => format!("quarantined since {}", since.to_rfc3339()),
        };
        println!("  {:<38} {:<8} {}", key, backend.kind, state);
        if backend.success_count + backend.failure_count > 0 {
            println!(
                "  {:<38} ok={} failed={} avg={:.0}ms",
                "", backend.success_count, backend.failure_count, backend.avg_response_time_ms
            );
        }
    }
    Ok(())
}

fn chains(orchestrator: &Orchestrator) {
    for category in TaskCategory::ALL {
        let chain = orchestrator.chain(category);
        if chain.is_empty() {
            println!("{:<10} (no backend available)", category);
            continue;
        }
        let keys: Vec<&str> = chain.keys.iter().map(|k| k.as_str()).collect();
        println!("{:<10} {}", category, keys.join(" -> "));
    }
}

async fn run(orchestrator: &Orchestrator, request: &ExecutionRequest) -> Result<()> {
    let result = orchestrator
        .execute(request)
        .await
        .context("No backend can serve this request")?;

    if !result.is_exhausted() {
        println!("{}\n", result.content);
    }

    let backend = result
        .backend
        .as_ref()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "none".to_string());
    eprintln!("backend:    {}", backend);
    eprintln!("attempts:   {}", result.attempts);
    eprintln!("elapsed:    {}ms", result.elapsed.as_millis());
    eprintln!("cost:       ${:.6}", result.cost_estimate);
    eprintln!("confidence: {:.2}", result.confidence);
    for error in &result.errors {
        eprintln!("error:      {}", error);
    }

    if result.is_exhausted() {
        bail!("all {} attempts failed", result.attempts);
    }
    Ok(())
}

async fn health(orchestrator: &Orchestrator) {
    let report = orchestrator.health_check().await;
    println!("{} of {} adapters healthy", report.healthy_count(), report.results.len());
    for (key, healthy) in &report.results {
        println!("  {:<38} {}", key, if *healthy { "ok" } else { "unhealthy" });
    }
}
