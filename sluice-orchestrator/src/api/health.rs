//! Health Check API Handler

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::AppState;

/// GET /health
/// Liveness plus the number of runs currently tracked
pub async fn health_check(State(engine): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tracked_runs": engine.tracker().len(),
    }))
}
