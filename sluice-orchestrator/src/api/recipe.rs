//! Recipe API Handlers
//!
//! HTTP endpoints for validating and triggering recipes.

use axum::{Json, extract::State, http::StatusCode};
use sluice_core::dto::recipe::{
    TriggerRecipe, TriggerResponse, ValidateRecipe, ValidateRecipeResponse,
};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::recipe_service;

/// POST /recipe/validate
/// Validate a recipe and report how it would be bound, without running it
pub async fn validate_recipe(
    State(engine): State<AppState>,
    Json(req): Json<ValidateRecipe>,
) -> ApiResult<Json<ValidateRecipeResponse>> {
    tracing::debug!("Validating recipe: {:?}", req.recipe);

    let resp = recipe_service::validate_recipe(&engine, req)?;
    Ok(Json(resp))
}

/// POST /recipe/trigger
/// Run a recipe
///
/// Sync runs answer 200 with the result once terminal; async runs answer
/// 202 with the run id as soon as the run is tracked.
pub async fn trigger_recipe(
    State(engine): State<AppState>,
    Json(req): Json<TriggerRecipe>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    tracing::info!(
        "Triggering recipe {} -> {} model(s) -> {} (mode: {:?}, {} input(s))",
        req.recipe.source,
        req.recipe.model_instances.len(),
        req.recipe.destination,
        req.mode,
        req.inputs.len()
    );

    let resp = recipe_service::trigger_recipe(&engine, req).await?;
    let status = match resp {
        TriggerResponse::Sync(_) => StatusCode::OK,
        TriggerResponse::Async(_) => StatusCode::ACCEPTED,
    };

    Ok((status, Json(resp)))
}
