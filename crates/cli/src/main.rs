//! TeraOps CLI
//!
//! A command-line tool for running QPU block optimization jobs, checking
//! their status and viewing results and the dashboard summary.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{optimize, summary};
use optimizer_lib::client::ApiClientConfig;
use optimizer_lib::ApiClient;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// TeraOps CLI
#[derive(Parser)]
#[command(name = "teraops")]
#[command(author, version, about = "CLI for TeraOps QPU block optimization", long_about = None)]
pub struct Cli {
    /// API endpoint URL [default: http://localhost:8000]
    #[arg(long, env = "TERAOPS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Write logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run and inspect optimization jobs
    #[command(subcommand)]
    Optimize(OptimizeCommands),

    /// Show the dashboard summary
    Summary,
}

#[derive(Subcommand)]
pub enum OptimizeCommands {
    /// Submit a job and follow it until it finishes
    Run(RunArgs),

    /// Show the status of the most recent job
    Status,

    /// Show the results of the most recent completed job
    Results,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Optimization strategy (e.g. cost_efficiency)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Workload threshold [default: 50]
    #[arg(long)]
    pub threshold: Option<String>,

    /// Maximum number of blocks to consider [default: 100]
    #[arg(long)]
    pub max_blocks: Option<String>,

    /// Additional numeric parameter (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Seconds between status checks
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Give up after this many status checks
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Give up when the job has not finished after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

/// Initialize tracing; logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    );

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = config::CliConfig::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    debug!(api_url = %config.api_url, "CLI configured");

    // Initialize client
    let client = ApiClient::with_config(ApiClientConfig {
        base_url: config.api_url.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
        ..Default::default()
    })
    .context("Failed to create API client")?;

    // Execute command
    match cli.command {
        Commands::Optimize(optimize_cmd) => match optimize_cmd {
            OptimizeCommands::Run(args) => {
                optimize::run_job(client, &args, &config, cli.format).await?;
            }
            OptimizeCommands::Status => {
                optimize::show_status(&client, cli.format).await?;
            }
            OptimizeCommands::Results => {
                optimize::show_results(&client, cli.format).await?;
            }
        },
        Commands::Summary => {
            summary::show_summary(&client, cli.format).await?;
        }
    }

    Ok(())
}
