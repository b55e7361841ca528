//! Run API Handlers
//!
//! HTTP endpoints for querying and canceling runs.

use axum::{
    Json,
    extract::{Path, State},
};
use sluice_core::domain::run::Run;
use sluice_core::dto::run::{CancelRunResponse, RunSummary};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::run_service;

/// GET /run/list
/// List all tracked runs
pub async fn list_runs(State(engine): State<AppState>) -> Json<Vec<RunSummary>> {
    tracing::debug!("Listing runs");
    Json(run_service::list_runs(&engine))
}

/// GET /run/{id}
/// Get run state and result or error
pub async fn get_run(State(engine): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Run>> {
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(&engine, id)?;
    Ok(Json(run))
}

/// DELETE /run/{id}
/// Best-effort cancellation
pub async fn cancel_run(
    State(engine): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelRunResponse>> {
    tracing::info!("Canceling run: {}", id);

    let resp = run_service::cancel_run(&engine, id)?;
    Ok(Json(resp))
}
