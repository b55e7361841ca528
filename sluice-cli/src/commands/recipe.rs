//! Recipe command handlers
//!
//! Validates and triggers recipes read from JSON files.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::*;
use sluice_client::OrchestratorClient;
use sluice_core::domain::recipe::{ExecutionMode, Recipe};
use sluice_core::domain::record::Record;
use sluice_core::domain::run::StageDescriptor;
use sluice_core::dto::recipe::{TriggerRecipe, TriggerResponse, ValidateRecipe};

use crate::commands::run::print_run_details;
use crate::config::Config;

/// Recipe subcommands
#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Validate a recipe and show the stages it resolves to
    Validate {
        /// Path to the recipe JSON file
        #[arg(short, long)]
        file: String,

        /// Force an execution mode instead of inferring it
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },
    /// Trigger a recipe
    Trigger {
        /// Path to the recipe JSON file
        #[arg(short, long)]
        file: String,

        /// Force an execution mode instead of inferring it
        #[arg(short, long)]
        mode: Option<ModeArg>,

        /// Path to a JSON array of input records
        #[arg(short, long)]
        inputs: Option<String>,

        /// For async runs, poll until the run is terminal
        #[arg(short, long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "300")]
        timeout: u64,
    },
}

/// Execution mode as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Sync,
    Async,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sync => ExecutionMode::Sync,
            ModeArg::Async => ExecutionMode::Async,
        }
    }
}

/// Handle recipe commands
pub async fn handle_recipe_command(command: RecipeCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RecipeCommands::Validate { file, mode } => validate(&client, &file, mode).await,
        RecipeCommands::Trigger {
            file,
            mode,
            inputs,
            wait,
            timeout,
        } => {
            trigger(
                &client,
                &file,
                mode,
                inputs.as_deref(),
                wait.then(|| Duration::from_secs(timeout)),
            )
            .await
        }
    }
}

/// Validate a recipe file
async fn validate(client: &OrchestratorClient, file: &str, mode: Option<ModeArg>) -> Result<()> {
    let recipe = read_recipe(file)?;

    let resp = client
        .validate_recipe(ValidateRecipe {
            recipe,
            mode: mode.map(Into::into),
        })
        .await?;

    println!("{}", "✓ Recipe is valid".green().bold());
    println!("  Mode:   {}", resp.mode.to_string().cyan());
    println!("  Stages: {}", resp.stages.len());
    println!();
    for stage in &resp.stages {
        print_stage(stage);
    }

    Ok(())
}

/// Trigger a recipe file
async fn trigger(
    client: &OrchestratorClient,
    file: &str,
    mode: Option<ModeArg>,
    inputs: Option<&str>,
    wait: Option<Duration>,
) -> Result<()> {
    let recipe = read_recipe(file)?;
    let inputs = match inputs {
        Some(path) => read_inputs(path)?,
        None => Vec::new(),
    };

    println!(
        "Triggering {} stage(s) with {} input record(s)...",
        recipe.stage_count(),
        inputs.len()
    );

    let resp = client
        .trigger(TriggerRecipe {
            recipe,
            mode: mode.map(Into::into),
            inputs,
        })
        .await?;

    match resp {
        TriggerResponse::Sync(resp) => {
            println!("{}", "✓ Run completed".green().bold());
            println!("  Run ID:    {}", resp.run_id.to_string().cyan());
            println!("  State:     {}", resp.state.to_string().green());
            println!("  Committed: {}", resp.result.committed);
            if let Some(ack) = &resp.result.ack {
                println!("\n{}", "Acknowledgement:".bold());
                println!("{}", serde_json::to_string_pretty(ack)?);
            }
        }
        TriggerResponse::Async(resp) => {
            println!("{}", "✓ Run accepted".green().bold());
            println!("  Run ID: {}", resp.run_id.to_string().cyan());

            if let Some(timeout) = wait {
                println!("{}", "  Waiting for the run to finish...".dimmed());
                let run = client
                    .wait_for_run(resp.run_id, Duration::from_secs(1), timeout)
                    .await?;
                println!();
                print_run_details(&run);
            }
        }
    }

    Ok(())
}

fn read_recipe(path: &str) -> Result<Recipe> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read recipe file: {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid recipe in {}", path))
}

fn read_inputs(path: &str) -> Result<Vec<Record>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read inputs file: {}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Inputs in {} must be a JSON array", path))
}

pub(crate) fn print_stage(stage: &StageDescriptor) {
    println!(
        "  {} [{}] {} {}",
        "▸".cyan(),
        stage.index,
        stage.kind.to_string().bold(),
        stage.resolved
    );
    println!("      {}", stage.permalink.dimmed());
}
