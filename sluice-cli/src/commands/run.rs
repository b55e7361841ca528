//! Run command handlers
//!
//! Lists, inspects, waits on, and cancels tracked runs.

use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use sluice_client::OrchestratorClient;
use sluice_core::domain::run::{Run, RunState};
use sluice_core::dto::run::RunSummary;

use crate::commands::recipe::print_stage;
use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::IdOrPrefix;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// List tracked runs
    List,
    /// Get run details
    Get {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Request cancellation of a run
    Cancel {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Wait for a run to finish
    Wait {
        /// Run ID or unambiguous prefix
        id: String,

        /// Seconds between polls
        #[arg(long, default_value = "1")]
        interval: u64,

        /// Give up after this many seconds
        #[arg(long, default_value = "300")]
        timeout: u64,
    },
}

/// Handle run commands
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RunCommands::List => list_runs(&client).await,
        RunCommands::Get { id } => get_run(&client, &id).await,
        RunCommands::Cancel { id } => cancel_run(&client, &id).await,
        RunCommands::Wait {
            id,
            interval,
            timeout,
        } => {
            wait_run(
                &client,
                &id,
                Duration::from_secs(interval),
                Duration::from_secs(timeout),
            )
            .await
        }
    }
}

async fn list_runs(client: &OrchestratorClient) -> Result<()> {
    let runs = client.list_runs().await?;

    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
    } else {
        println!("{}", format!("Found {} run(s):", runs.len()).bold());
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

async fn get_run(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, &IdOrPrefix::parse(id)).await?;
    let run = client.get_run(uuid).await?;

    print_run_details(&run);

    Ok(())
}

async fn cancel_run(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, &IdOrPrefix::parse(id)).await?;
    let resp = client.cancel_run(uuid).await?;

    match resp.state {
        RunState::Canceled => println!("{} Run {} canceled", "✓".green(), uuid),
        RunState::Running => println!(
            "{} Cancellation requested; run {} stops before its next stage",
            "⚠".yellow(),
            uuid
        ),
        state => println!(
            "{} Run {} already finished ({})",
            "•".dimmed(),
            uuid,
            colorize_state(state)
        ),
    }

    Ok(())
}

async fn wait_run(
    client: &OrchestratorClient,
    id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let uuid = resolve_run_id(client, &IdOrPrefix::parse(id)).await?;
    let run = client.wait_for_run(uuid, interval, timeout).await?;

    print_run_details(&run);

    Ok(())
}

fn print_run_summary(run: &RunSummary) {
    println!("  {} Run {}", "▸".cyan(), run.id.to_string().dimmed());
    println!("    Mode:      {}", run.mode);
    println!("    State:     {}", colorize_state(run.state));
    println!("    Stages:    {}", run.stage_count);
    println!(
        "    Requested: {}",
        run.requested_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed run information
pub(crate) fn print_run_details(run: &Run) {
    println!("{}", "Run Details:".bold());
    println!("  ID:        {}", run.id.to_string().cyan());
    println!("  Mode:      {}", run.mode);
    println!("  State:     {}", colorize_state(run.state));
    println!(
        "  Requested: {}",
        run.requested_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(started) = run.started_at {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(ended) = run.ended_at {
        println!("  Ended:     {}", ended.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = run.started_at {
            let duration = ended.signed_duration_since(started);
            println!("  Duration:  {}ms", duration.num_milliseconds());
        }
    }

    println!("\n{}", "Stages:".bold());
    for stage in &run.stages {
        print_stage(stage);
    }

    if let Some(result) = &run.result {
        println!("\n{}", "Result:".bold());
        println!("  Committed: {}", result.committed);
        if let Some(ack) = &result.ack {
            if let Ok(pretty) = serde_json::to_string_pretty(ack) {
                println!("{}", pretty);
            }
        }
    }

    if let Some(error) = &run.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.to_string().red());
    }
}

fn colorize_state(state: RunState) -> colored::ColoredString {
    let state_str = state.to_string();
    match state {
        RunState::Pending => state_str.yellow(),
        RunState::Running => state_str.cyan(),
        RunState::Succeeded => state_str.green(),
        RunState::Failed => state_str.red(),
        RunState::Canceled => state_str.dimmed(),
    }
}
