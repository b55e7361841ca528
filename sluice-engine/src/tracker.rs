//! Run tracker
//!
//! Keeps in-flight and completed runs so asynchronous callers can poll and
//! cancel them. The engine is the only writer; readers get cloned
//! snapshots. Terminal runs are retained for a bounded window and up to a
//! bounded count.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use sluice_core::domain::run::{InvalidTransition, Run, RunState, Transition};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::capability::CancelHandle;
use crate::config::EngineConfig;
use crate::registry::{read, write};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("run {0} is already tracked")]
    AlreadyRegistered(Uuid),

    #[error("run {id}: {source}")]
    InvalidTransition {
        id: Uuid,
        #[source]
        source: InvalidTransition,
    },
}

/// Retention bounds for terminal runs
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub window: Duration,
    pub max_runs: usize,
}

impl From<&EngineConfig> for RetentionPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            window: config.retention_window,
            max_runs: config.retention_max_runs,
        }
    }
}

struct TrackedRun {
    run: Run,
    /// Present until the run is terminal
    cancel: Option<CancelHandle>,
}

pub struct RunTracker {
    runs: RwLock<HashMap<Uuid, TrackedRun>>,
    retention: RetentionPolicy,
}

impl RunTracker {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Starts tracking a run
    pub fn register(&self, run: Run, cancel: Option<CancelHandle>) -> Result<(), TrackerError> {
        self.sweep(Utc::now());

        let mut runs = write(&self.runs);
        if runs.contains_key(&run.id) {
            return Err(TrackerError::AlreadyRegistered(run.id));
        }

        debug!("Tracking run {} ({:?})", run.id, run.state);
        runs.insert(run.id, TrackedRun { run, cancel });
        Ok(())
    }

    /// Snapshot of a run
    pub fn get(&self, id: Uuid) -> Result<Run, TrackerError> {
        read(&self.runs)
            .get(&id)
            .map(|tracked| tracked.run.clone())
            .ok_or(TrackerError::NotFound(id))
    }

    /// Snapshots of all tracked runs, most recent first
    pub fn list(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = read(&self.runs)
            .values()
            .map(|tracked| tracked.run.clone())
            .collect();
        runs.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        runs
    }

    /// Applies a transition and returns the new state
    pub fn update(&self, id: Uuid, transition: Transition) -> Result<RunState, TrackerError> {
        let mut runs = write(&self.runs);
        let tracked = runs.get_mut(&id).ok_or(TrackerError::NotFound(id))?;

        tracked
            .run
            .apply(transition)
            .map_err(|source| TrackerError::InvalidTransition { id, source })?;

        let state = tracked.run.state;
        if state.is_terminal() {
            tracked.cancel = None;
        }

        debug!("Run {} -> {:?}", id, state);
        Ok(state)
    }

    /// Removes a run; returns whether it was tracked
    pub fn evict(&self, id: Uuid) -> bool {
        write(&self.runs).remove(&id).is_some()
    }

    /// Records a cancellation request and returns the resulting state
    ///
    /// A pending run is canceled on the spot. A running run is signalled and
    /// keeps its state until the engine observes the signal. Terminal runs
    /// are left untouched.
    pub fn request_cancel(&self, id: Uuid) -> Result<RunState, TrackerError> {
        let mut runs = write(&self.runs);
        let tracked = runs.get_mut(&id).ok_or(TrackerError::NotFound(id))?;

        match tracked.run.state {
            RunState::Pending => {
                if let Some(cancel) = tracked.cancel.take() {
                    cancel.cancel();
                }
                tracked
                    .run
                    .apply(Transition::Cancel)
                    .map_err(|source| TrackerError::InvalidTransition { id, source })?;
                info!("Run {} canceled before start", id);
            }
            RunState::Running => {
                if let Some(cancel) = &tracked.cancel {
                    cancel.cancel();
                }
                info!("Cancellation requested for run {}", id);
            }
            state => debug!("Cancel of run {} ignored, already {:?}", id, state),
        }

        Ok(tracked.run.state)
    }

    /// Evicts terminal runs past the retention bounds; returns how many
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = TimeDelta::from_std(self.retention.window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window));

        let mut runs = write(&self.runs);
        let before = runs.len();

        if let Some(cutoff) = cutoff {
            runs.retain(|_, tracked| match tracked.run.ended_at {
                Some(ended_at) if tracked.run.state.is_terminal() => ended_at > cutoff,
                _ => true,
            });
        }

        let mut terminal: Vec<(DateTime<Utc>, Uuid)> = runs
            .values()
            .filter(|tracked| tracked.run.state.is_terminal())
            .map(|tracked| {
                (
                    tracked.run.ended_at.unwrap_or(tracked.run.requested_at),
                    tracked.run.id,
                )
            })
            .collect();

        if terminal.len() > self.retention.max_runs {
            terminal.sort();
            let excess = terminal.len() - self.retention.max_runs;
            for (_, id) in terminal.into_iter().take(excess) {
                runs.remove(&id);
            }
        }

        let evicted = before - runs.len();
        if evicted > 0 {
            info!("Evicted {} terminal run(s)", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        read(&self.runs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
