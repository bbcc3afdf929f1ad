//! Dashboard summary command

use anyhow::{Context, Result};
use colored::Colorize;
use optimizer_lib::{present_summary, ApiClient};
use tabled::Tabled;

use crate::output::{print_field, print_heading, print_json, print_table, OutputFormat};

/// Row for blocks by type table
#[derive(Tabled)]
struct BlockTypeRow {
    #[tabled(rename = "Type")]
    block_type: String,
    #[tabled(rename = "Blocks")]
    count: u64,
}

/// Show the dashboard summary
pub async fn show_summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client
        .fetch_summary()
        .await
        .context("Error fetching dashboard summary")?;
    let display = present_summary(&summary);

    match format {
        OutputFormat::Json => print_json(&display)?,
        OutputFormat::Table => {
            print_heading("Dashboard Summary");
            print_field("Total QPU Blocks", &display.total_blocks);
            print_field("Total Workloads", &display.total_workloads);
            print_field("Avg. Daily Cost", &display.average_cost_per_day);
            print_field("Cost Savings", display.cost_savings.green());
            println!();

            println!("{}", "Blocks by Type".bold());
            println!("{}", "-".repeat(50));
            let rows: Vec<BlockTypeRow> = display
                .blocks_by_type
                .iter()
                .map(|entry| BlockTypeRow {
                    block_type: entry.category.clone(),
                    count: entry.count,
                })
                .collect();
            print_table(&rows, "No blocks found");

            if !display.recommendation.is_empty() {
                println!();
                println!("{} {}", "Recommendation:".bold(), display.recommendation);
            }
        }
    }

    Ok(())
}
