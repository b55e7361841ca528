//! Sluice CLI
//!
//! Validates and triggers recipes against a Sluice orchestrator and keeps
//! track of the runs they start.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

/// Run source → model → destination recipes on a Sluice orchestrator
///
/// Sync recipes print their result as soon as the destination commits.
/// Async recipes print a run id; follow it with `sluice run wait <id>`.
#[derive(Parser)]
#[command(name = "sluice", version)]
struct Cli {
    /// Base URL of the orchestrator, e.g. http://sluice.internal:8080
    #[arg(
        long,
        short = 'u',
        env = "SLUICE_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
    };

    handle_command(cli.command, &config).await
}
