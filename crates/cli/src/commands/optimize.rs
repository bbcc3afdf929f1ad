//! Optimization job CLI commands

use anyhow::{bail, Context, Result};
use colored::Colorize;
use optimizer_lib::request::split_assignment;
use optimizer_lib::{
    present, ApiClient, DisplayResult, JobClient, JobEvent, JobOrchestrator, JobParameters,
    JobRequestBuilder, JobStatus, PollConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tracing::info;

use crate::config::CliConfig;
use crate::output::{
    color_status, print_field, print_heading, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};
use crate::RunArgs;

/// Row for the before/after distribution table
#[derive(Tabled)]
struct DistributionTableRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Before")]
    before: u64,
    #[tabled(rename = "After")]
    after: u64,
}

/// Row for the transfer recommendations table
#[derive(Tabled)]
struct TransferRow {
    #[tabled(rename = "Block ID")]
    block_id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Avg Daily Workloads")]
    avg_daily_workloads: String,
    #[tabled(rename = "30d Savings")]
    savings_30d: String,
    #[tabled(rename = "Break-even (days)")]
    break_even_days: String,
}

/// Submit a job, follow it to a terminal status and render the result
///
/// Ctrl-C cancels the job. Fails when the job ends `failed`, is cancelled,
/// or completes without a retrievable result.
pub async fn run_job(
    client: ApiClient,
    args: &RunArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let parameters = build_parameters(args, config)?;
    let poll = poll_config(args, config)?;

    let backend = client.base_url().to_string();
    let client: Arc<dyn JobClient> = Arc::new(client);
    let orchestrator = JobOrchestrator::builder(client)
        .config(poll)
        .backend_label(backend)
        .build();

    // Progress lines would corrupt JSON output
    if format == OutputFormat::Table {
        orchestrator.subscribe(print_event);
    }

    let generation = orchestrator.start(parameters);
    info!(generation = generation, "Optimization job started");

    let state = tokio::select! {
        state = orchestrator.wait_for_terminal() => state,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.cancel();
            bail!("Optimization cancelled");
        }
    };

    match state.status {
        JobStatus::Completed => match &state.result {
            Some(result) => render_result(&present(result), format),
            None => {
                let reason = state
                    .failure
                    .map(|failure| failure.to_string())
                    .unwrap_or_else(|| "no result returned".to_string());
                bail!("Optimization completed but results could not be retrieved: {}", reason)
            }
        },
        JobStatus::Failed => bail!(
            "Optimization failed: {}",
            state.message.unwrap_or_else(|| "unknown error".to_string())
        ),
        other => bail!("Optimization stopped in state '{}'", other),
    }
}

/// Show the status of the most recent job
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client
        .fetch_status()
        .await
        .context("Error checking status")?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": status.state.as_str(),
            "message": status.message,
        }))?,
        OutputFormat::Table => {
            print_field("Status", color_status(status.state.as_str()));
            if let Some(message) = &status.message {
                print_field("Message", message);
            }
        }
    }

    Ok(())
}

/// Show the results of the most recent completed job
pub async fn show_results(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client
        .fetch_results()
        .await
        .context("Error fetching results")?;

    render_result(&present(&result), format)
}

/// Build validated job parameters from flags and configuration
fn build_parameters(args: &RunArgs, config: &CliConfig) -> Result<JobParameters> {
    let strategy = args
        .strategy
        .clone()
        .unwrap_or_else(|| config.default_strategy.clone());
    let mut builder = JobRequestBuilder::with_defaults().strategy(strategy);

    if let Some(threshold) = &args.threshold {
        builder = builder.parameter("workload_threshold", threshold.as_str());
    }
    if let Some(max_blocks) = &args.max_blocks {
        builder = builder.parameter("max_blocks", max_blocks.as_str());
    }
    for pair in &args.params {
        let (name, value) = split_assignment(pair)?;
        builder = builder.parameter(name, value);
    }

    Ok(builder.build()?)
}

/// Resolve polling knobs; flags win over configuration
fn poll_config(args: &RunArgs, config: &CliConfig) -> Result<PollConfig> {
    let interval_secs = args.poll_interval_secs.unwrap_or(config.poll_interval_secs);
    if interval_secs == 0 {
        bail!("Poll interval must be at least 1 second");
    }

    Ok(PollConfig {
        interval: Duration::from_secs(interval_secs),
        max_polls: args.max_polls.or(config.max_polls),
        deadline: args
            .deadline_secs
            .or(config.deadline_secs)
            .map(Duration::from_secs),
    })
}

fn print_event(event: &JobEvent) {
    match event {
        JobEvent::Transition { snapshot, .. } => {
            let status = color_status(&snapshot.status.to_string());
            match &snapshot.message {
                Some(message) => print_info(&format!("Status: {} ({})", status, message)),
                None => print_info(&format!("Status: {}", status)),
            }
        }
        JobEvent::Progress { snapshot } => {
            print_info(&format!(
                "Still processing (status check {})",
                snapshot.polls
            ));
        }
        JobEvent::ResultReady { .. } => print_success("Results retrieved"),
        JobEvent::ResultUnavailable { snapshot } => {
            if let Some(failure) = &snapshot.failure {
                print_warning(&format!("Results unavailable: {}", failure));
            }
        }
    }
}

fn render_result(display: &DisplayResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(display)?,
        OutputFormat::Table => {
            println!();
            print_heading("Optimization Results");
            print_field("Blocks Analyzed", display.blocks_analyzed);
            print_field("Transfers Recommended", display.transfers_recommended);
            print_field("Current Avg Daily Cost", &display.current_daily_cost);
            print_field("Expected Avg Daily Cost", &display.expected_daily_cost);
            print_field(
                "Expected Monthly Savings",
                display.monthly_savings.green(),
            );
            print_field("Improvement", display.improvement.green().bold());
            println!();

            println!("{}", "Block Distribution".bold());
            println!("{}", "-".repeat(50));
            let rows: Vec<DistributionTableRow> = display
                .distribution
                .iter()
                .map(|row| DistributionTableRow {
                    category: row.category.clone(),
                    before: row.current,
                    after: row.optimized,
                })
                .collect();
            print_table(&rows, "No distribution data");
            println!();

            println!("{}", "Transfer Recommendations".bold());
            println!("{}", "-".repeat(50));
            let rows: Vec<TransferRow> = display
                .transfers
                .iter()
                .map(|t| TransferRow {
                    block_id: t.block_id.clone(),
                    from: t.from.clone(),
                    to: t.to.clone(),
                    size: t.size.clone(),
                    avg_daily_workloads: t.avg_daily_workloads.clone(),
                    savings_30d: t.savings_30d.clone(),
                    break_even_days: t.break_even_days.clone(),
                })
                .collect();
            print_table(&rows, "No transfers recommended");
        }
    }

    Ok(())
}
