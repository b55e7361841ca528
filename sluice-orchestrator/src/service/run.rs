//! Run Service
//!
//! Queries and cancellation of tracked runs.

use sluice_core::domain::run::Run;
use sluice_core::dto::run::{CancelRunResponse, RunSummary};
use sluice_engine::{Engine, TrackerError};
use uuid::Uuid;

/// Service error type
#[derive(Debug)]
pub enum RunError {
    NotFound(Uuid),
    InvalidState(String),
}

impl From<TrackerError> for RunError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound(id) => RunError::NotFound(id),
            other => RunError::InvalidState(other.to_string()),
        }
    }
}

/// Get a run by ID
pub fn get_run(engine: &Engine, id: Uuid) -> Result<Run, RunError> {
    Ok(engine.poll(id)?)
}

/// List all tracked runs
pub fn list_runs(engine: &Engine) -> Vec<RunSummary> {
    engine.runs().iter().map(RunSummary::from).collect()
}

/// Request cancellation of a run
pub fn cancel_run(engine: &Engine, id: Uuid) -> Result<CancelRunResponse, RunError> {
    let state = engine.cancel(id)?;
    tracing::info!("Cancel requested for run {}, now {:?}", id, state);

    Ok(CancelRunResponse { run_id: id, state })
}
