//! Run domain types
//!
//! A run is one execution attempt of a built pipeline. The engine is the only
//! writer of a run; everything else reads snapshots of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::recipe::{ExecutionMode, Recipe};
use crate::domain::record::Record;

/// Run execution record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub mode: ExecutionMode,
    pub state: RunState,
    /// Recipe as submitted
    pub recipe: Recipe,
    /// Recipe with every reference pinned to the permalink that was bound at build time
    pub resolved_recipe: Recipe,
    pub stages: Vec<StageDescriptor>,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

/// Run lifecycle state
///
/// `Pending -> Running -> {Succeeded, Failed, Canceled}`, with `Canceled`
/// also reachable directly from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Canceled
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Pending => write!(f, "Pending"),
            RunState::Running => write!(f, "Running"),
            RunState::Succeeded => write!(f, "Succeeded"),
            RunState::Failed => write!(f, "Failed"),
            RunState::Canceled => write!(f, "Canceled"),
        }
    }
}

/// Payload produced by a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Records handed to the destination's commit
    pub records: Vec<Record>,
    /// Number of records the destination acknowledged
    pub committed: usize,
    /// Destination-specific acknowledgement payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<serde_json::Value>,
}

/// Kind of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Source,
    Model,
    Destination,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Source => write!(f, "source"),
            StageKind::Model => write!(f, "model"),
            StageKind::Destination => write!(f, "destination"),
        }
    }
}

/// Identity of a bound stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub index: usize,
    pub kind: StageKind,
    /// Reference as written in the recipe
    pub name: String,
    /// Concrete reference after alias resolution
    pub resolved: String,
    pub permalink: String,
}

/// Which capability call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    Fetch,
    Infer,
    Commit,
    Timeout,
}

impl std::fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageErrorKind::Fetch => write!(f, "fetch"),
            StageErrorKind::Infer => write!(f, "infer"),
            StageErrorKind::Commit => write!(f, "commit"),
            StageErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Failure of a single stage, recorded as the terminal error of a run
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("stage {stage_index} ({stage}) failed during {kind}: {cause}")]
pub struct StageError {
    pub stage_index: usize,
    /// Resolved reference of the failing stage
    pub stage: String,
    pub stage_kind: StageKind,
    pub kind: StageErrorKind,
    pub cause: String,
}

/// A state change applied to a run
#[derive(Debug, Clone)]
pub enum Transition {
    Start,
    Succeed(RunOutput),
    Fail(StageError),
    Cancel,
}

impl Transition {
    /// State the run ends up in after this transition
    pub fn target(&self) -> RunState {
        match self {
            Transition::Start => RunState::Running,
            Transition::Succeed(_) => RunState::Succeeded,
            Transition::Fail(_) => RunState::Failed,
            Transition::Cancel => RunState::Canceled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid run transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

impl Run {
    /// Creates a new pending run
    pub fn new(
        id: Uuid,
        mode: ExecutionMode,
        recipe: Recipe,
        resolved_recipe: Recipe,
        stages: Vec<StageDescriptor>,
    ) -> Self {
        Self {
            id,
            mode,
            state: RunState::Pending,
            recipe,
            resolved_recipe,
            stages,
            requested_at: Utc::now(),
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
        }
    }

    /// Applies a transition, enforcing the run state machine
    pub fn apply(&mut self, transition: Transition) -> Result<(), InvalidTransition> {
        let from = self.state;
        let to = transition.target();

        let allowed = match (from, &transition) {
            (RunState::Pending, Transition::Start) => true,
            (RunState::Running, Transition::Succeed(_) | Transition::Fail(_)) => true,
            (RunState::Pending | RunState::Running, Transition::Cancel) => true,
            _ => false,
        };

        if !allowed {
            return Err(InvalidTransition { from, to });
        }

        let now = Utc::now();
        match transition {
            Transition::Start => self.started_at = Some(now),
            Transition::Succeed(output) => {
                self.result = Some(output);
                self.ended_at = Some(now);
            }
            Transition::Fail(error) => {
                self.error = Some(error);
                self.ended_at = Some(now);
            }
            Transition::Cancel => {
                self.result = None;
                self.ended_at = Some(now);
            }
        }
        self.state = to;

        Ok(())
    }
}
