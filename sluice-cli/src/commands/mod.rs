//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod recipe;
mod run;

pub use recipe::RecipeCommands;
pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Recipe validation and triggering
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Run inspection and cancellation
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Check that the orchestrator is reachable
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Recipe { command } => recipe::handle_recipe_command(command, config).await,
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Health => {
            let health = config.client().health().await?;
            println!("{} {}", "✓".green(), config.orchestrator_url);
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
    }
}
