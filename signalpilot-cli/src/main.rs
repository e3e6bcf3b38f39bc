//! SignalPilot CLI — analysis, evaluation, and report commands.
//!
//! Commands:
//! - `analyze` — run one analysis cycle and persist the record
//! - `evaluate` — grade the lookback window and print the summary
//! - `report` — re-print the most recent stored summary

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use signalpilot_core::agents::{AnalysisAgent, ConfidenceScale, LlmAgent, LlmConfig};
use signalpilot_core::domain::AgentFamily;
use signalpilot_runner::{
    render_report, run_analysis_cycle, run_evaluation, JsonlRepository, KrakenProvider,
    PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "signalpilot",
    about = "SignalPilot CLI — automated trading-signal pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis cycle: fetch data, consult the analysts, persist.
    Analyze {
        /// Path to the pipeline TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Override the configured symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// Override the configured interval (minutes).
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Grade recent recommendations against what the market did.
    Evaluate {
        /// Path to the pipeline TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Override the lookback window (hours).
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Print the most recent stored evaluation summary.
    Report {
        /// Path to the pipeline TOML config.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            config,
            symbol,
            interval,
        } => run_analyze(&config, symbol, interval),
        Commands::Evaluate { config, hours } => run_evaluate(&config, hours),
        Commands::Report { config } => run_report(&config),
    }
}

fn run_analyze(config_path: &Path, symbol: Option<String>, interval: Option<u32>) -> Result<()> {
    let mut config = PipelineConfig::load(config_path)?;
    if let Some(symbol) = symbol {
        config.symbol = symbol;
    }
    if let Some(interval) = interval {
        config.interval = interval;
        config.validate()?;
    }
    let interval = config.parsed_interval()?;

    let provider = KrakenProvider::new(config.market_timeout_secs)?;
    let store = JsonlRepository::open(&config.data_dir)?;
    let agents = build_agents(&config)?;

    let outcome = run_analysis_cycle(
        &config.symbol,
        interval,
        &provider,
        &agents,
        &store,
        &config.planner,
        config.failure_policy,
    )?;

    info!(uuid = %outcome.record.uuid, "record persisted");
    println!(
        "{} {} @ {:.2}: {} ({:.2})",
        outcome.record.symbol,
        outcome.record.timestamp.format("%Y-%m-%d %H:%M UTC"),
        outcome.record.current_price,
        outcome.record.recommendation,
        outcome.record.confidence.value(),
    );
    if let Some(plan) = &outcome.record.entry_position {
        println!(
            "entry {:.2} / stop {:.2} / exit {:.2} (rr {:.2})",
            plan.entry_price, plan.stop_loss, plan.exit_price, plan.rr_ratio
        );
    }
    if outcome.degraded {
        println!(
            "degraded: {} family agent(s) failed",
            outcome.failed_families.len()
        );
    }
    Ok(())
}

fn run_evaluate(config_path: &Path, hours: Option<i64>) -> Result<()> {
    let mut config = PipelineConfig::load(config_path)?;
    if let Some(hours) = hours {
        if hours <= 0 {
            bail!("--hours must be positive");
        }
        config.evaluator.timeframe_hours = hours;
    }
    let interval = config.parsed_interval()?;

    let provider = KrakenProvider::new(config.market_timeout_secs)?;
    let store = JsonlRepository::open(&config.data_dir)?;

    let summary = run_evaluation(&config.symbol, interval, &provider, &store, &config.evaluator)?;
    print!("{}", summary.formatted_summary);
    Ok(())
}

fn run_report(config_path: &Path) -> Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let interval = config.parsed_interval()?;
    let store = JsonlRepository::open(&config.data_dir)?;
    print!("{}", render_report(&store, &config.symbol, interval)?);
    Ok(())
}

/// One LLM agent per family, sharing the configured endpoint.
fn build_agents(config: &PipelineConfig) -> Result<Vec<Box<dyn AnalysisAgent>>> {
    let api_key = config
        .llm
        .api_key_env
        .as_deref()
        .map(|name| {
            std::env::var(name).with_context(|| format!("environment variable {name} is not set"))
        })
        .transpose()?;

    let llm = LlmConfig {
        endpoint: config.llm.endpoint.clone(),
        model: config.llm.model.clone(),
        api_key,
        timeout_secs: config.llm.timeout_secs,
    };

    Ok(AgentFamily::ALL
        .iter()
        .map(|&family| {
            Box::new(LlmAgent::new(family, ConfidenceScale::Unit, llm.clone()))
                as Box<dyn AnalysisAgent>
        })
        .collect())
}
