//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod recipe;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sluice_engine::Engine;
use tower_http::trace::TraceLayer;

/// Shared handler state
pub type AppState = Arc<Engine>;

/// Create the main API router with all endpoints
pub fn create_router(engine: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Recipe endpoints
        .route("/recipe/validate", post(recipe::validate_recipe))
        .route("/recipe/trigger", post(recipe::trigger_recipe))
        // Run endpoints
        .route("/run/list", get(run::list_runs))
        .route("/run/{id}", get(run::get_run).delete(run::cancel_run))
        // Add state and middleware
        .with_state(engine)
        .layer(TraceLayer::new_for_http())
}
