//! Recipe Service
//!
//! Validation and submission of recipes.

use sluice_core::domain::run::Run;
use sluice_core::dto::recipe::{
    TriggerAsyncResponse, TriggerRecipe, TriggerResponse, TriggerSyncResponse, ValidateRecipe,
    ValidateRecipeResponse,
};
use sluice_engine::{Engine, SubmitError, SubmitOutcome};

/// Service error type
#[derive(Debug)]
pub enum RecipeError {
    Submit(SubmitError),
    /// A sync run finished without a result
    MissingResult(uuid::Uuid),
}

impl From<SubmitError> for RecipeError {
    fn from(err: SubmitError) -> Self {
        RecipeError::Submit(err)
    }
}

/// Validate and dry-build a recipe
pub fn validate_recipe(
    engine: &Engine,
    req: ValidateRecipe,
) -> Result<ValidateRecipeResponse, RecipeError> {
    let prepared = engine.prepare(&req.recipe, req.mode)?;

    Ok(ValidateRecipeResponse {
        mode: prepared.mode,
        resolved_recipe: prepared.pipeline.resolved_recipe().clone(),
        stages: prepared.pipeline.descriptors(),
    })
}

/// Submit a recipe for execution
pub async fn trigger_recipe(
    engine: &Engine,
    req: TriggerRecipe,
) -> Result<TriggerResponse, RecipeError> {
    let outcome = engine.submit(&req.recipe, req.mode, req.inputs).await?;

    match outcome {
        SubmitOutcome::Completed(run) => sync_response(run).map(TriggerResponse::Sync),
        SubmitOutcome::Accepted(run_id) => {
            tracing::info!("Run {} accepted", run_id);
            Ok(TriggerResponse::Async(TriggerAsyncResponse { run_id }))
        }
    }
}

fn sync_response(run: Run) -> Result<TriggerSyncResponse, RecipeError> {
    let result = run.result.ok_or(RecipeError::MissingResult(run.id))?;

    Ok(TriggerSyncResponse {
        run_id: run.id,
        state: run.state,
        result,
    })
}
