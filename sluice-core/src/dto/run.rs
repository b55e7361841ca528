//! Run DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::recipe::ExecutionMode;
use crate::domain::run::{Run, RunState};

/// Summary information about a tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub mode: ExecutionMode,
    pub state: RunState,
    pub stage_count: usize,
    pub requested_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&Run> for RunSummary {
    fn from(run: &Run) -> Self {
        RunSummary {
            id: run.id,
            mode: run.mode,
            state: run.state,
            stage_count: run.stages.len(),
            requested_at: run.requested_at,
            ended_at: run.ended_at,
        }
    }
}

/// Response to a cancellation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunResponse {
    pub run_id: Uuid,
    /// State observed right after the request was recorded
    pub state: RunState,
}
