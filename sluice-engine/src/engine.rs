//! Execution engine
//!
//! Entry point of the engine crate: validates and builds submitted recipes,
//! then runs the resulting pipeline either inline (sync) or on a spawned
//! task tracked by the run tracker (async). Both modes share the same
//! stage loop, so they produce the same terminal content.

use std::sync::Arc;

use chrono::Utc;
use sluice_core::domain::recipe::{ExecutionMode, Recipe};
use sluice_core::domain::record::Record;
use sluice_core::domain::run::{Run, RunState, StageError, Transition};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builder::{BuildError, Pipeline, PipelineBuilder};
use crate::capability::CancelSignal;
use crate::config::EngineConfig;
use crate::execution::{RunFailure, execute};
use crate::mode::resolve_mode;
use crate::permalink::to_names;
use crate::registry::{ConnectorRegistry, ModelInstanceRegistry};
use crate::tracker::{RetentionPolicy, RunTracker, TrackerError};
use crate::validator::{RecipeValidator, ValidatedRecipe, ValidationError};

/// Errors surfaced to the submitter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// A stage of a synchronous run failed
    #[error("run {run_id} failed: {error}")]
    Stage { run_id: Uuid, error: StageError },

    #[error("run {0} was canceled")]
    Canceled(Uuid),

    /// The task driving a sync run panicked or was aborted
    #[error("run {0} was aborted")]
    Aborted(Uuid),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Outcome of a successful submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Sync: the terminal run, including its result
    Completed(Run),
    /// Async: the id of the tracked run
    Accepted(Uuid),
}

/// A pipeline ready to run, with its effective mode
#[derive(Debug)]
pub struct Prepared {
    pub mode: ExecutionMode,
    pub pipeline: Pipeline,
}

/// Recipe execution engine
pub struct Engine {
    config: EngineConfig,
    connectors: Arc<ConnectorRegistry>,
    models: Arc<ModelInstanceRegistry>,
    validator: RecipeValidator,
    builder: PipelineBuilder,
    tracker: Arc<RunTracker>,
    permits: Arc<Semaphore>,
}

impl Engine {
    /// Creates an engine over the given registries
    pub fn new(
        config: EngineConfig,
        connectors: Arc<ConnectorRegistry>,
        models: Arc<ModelInstanceRegistry>,
    ) -> Self {
        let tracker = Arc::new(RunTracker::new(RetentionPolicy::from(&config)));
        let permits = Arc::new(Semaphore::new(
            config.max_concurrent_runs.min(Semaphore::MAX_PERMITS),
        ));

        Self {
            validator: RecipeValidator::new(Arc::clone(&connectors), Arc::clone(&models)),
            builder: PipelineBuilder::new(Arc::clone(&connectors), Arc::clone(&models)),
            config,
            connectors,
            models,
            tracker,
            permits,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn connectors(&self) -> &Arc<ConnectorRegistry> {
        &self.connectors
    }

    pub fn models(&self) -> &Arc<ModelInstanceRegistry> {
        &self.models
    }

    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    /// Validates a recipe given by resource names or permalinks
    pub fn validate(&self, recipe: &Recipe) -> Result<ValidatedRecipe, ValidationError> {
        let recipe = to_names(recipe, &self.connectors, &self.models);
        self.validator.validate(&recipe)
    }

    pub fn build(&self, validated: &ValidatedRecipe) -> Result<Pipeline, BuildError> {
        self.builder.build(validated)
    }

    /// Validates, picks the mode and builds, without running anything
    pub fn prepare(
        &self,
        recipe: &Recipe,
        mode: Option<ExecutionMode>,
    ) -> Result<Prepared, SubmitError> {
        let validated = self.validate(recipe)?;
        let mode = resolve_mode(mode, &self.connectors, &validated)?;
        let pipeline = self.build(&validated)?;

        Ok(Prepared { mode, pipeline })
    }

    /// Submits a recipe
    ///
    /// Validation and build errors are returned before any run exists, in
    /// both modes. A sync submission returns the terminal run; an async one
    /// returns as soon as the run is tracked as `Pending`.
    pub async fn submit(
        &self,
        recipe: &Recipe,
        mode: Option<ExecutionMode>,
        inputs: Vec<Record>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let Prepared { mode, pipeline } = self.prepare(recipe, mode)?;

        match mode {
            ExecutionMode::Sync => self
                .run_sync(pipeline, inputs)
                .await
                .map(SubmitOutcome::Completed),
            ExecutionMode::Async => self
                .spawn_async(pipeline, inputs)
                .map(SubmitOutcome::Accepted),
        }
    }

    /// Runs a pipeline to completion and waits for it
    ///
    /// The run executes on its own task, so dropping the returned future
    /// (a disconnected caller) does not interrupt a stage mid-call. The run
    /// still completes and, when auditing is on, is still recorded.
    pub async fn run_sync(&self, pipeline: Pipeline, inputs: Vec<Record>) -> Result<Run, SubmitError> {
        let id = Uuid::new_v4();
        let mut run = Run::new(
            id,
            ExecutionMode::Sync,
            pipeline.recipe().clone(),
            pipeline.resolved_recipe().clone(),
            pipeline.descriptors(),
        );

        let tracker = Arc::clone(&self.tracker);
        let permits = Arc::clone(&self.permits);
        let stage_timeout = self.config.stage_timeout;
        let audit = self.config.audit_sync_runs;

        let task = tokio::spawn(async move {
            // Held until the run is terminal
            let _permit = permits.acquire_owned().await;

            apply(&mut run, Transition::Start)?;
            info!("Run {} started (sync, {} stages)", id, pipeline.stage_count());

            let result = execute(
                &pipeline,
                id,
                inputs,
                &CancelSignal::never(),
                stage_timeout,
            )
            .await;

            let outcome = match result {
                Ok(output) => apply(&mut run, Transition::Succeed(output)),
                Err(RunFailure::Stage(error)) => {
                    apply(&mut run, Transition::Fail(error.clone()))?;
                    Err(SubmitError::Stage { run_id: id, error })
                }
                Err(RunFailure::Canceled) => {
                    apply(&mut run, Transition::Cancel)?;
                    Err(SubmitError::Canceled(id))
                }
            };

            info!("Run {} completed with state {:?}", id, run.state);

            if audit {
                if let Err(e) = tracker.register(run.clone(), None) {
                    warn!("Failed to record sync run {}: {}", id, e);
                }
            }

            outcome.map(|()| run)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Sync run {} task did not complete: {}", id, e);
                Err(SubmitError::Aborted(id))
            }
        }
    }

    /// Tracks a pipeline as `Pending` and runs it on a spawned task
    pub fn spawn_async(&self, pipeline: Pipeline, inputs: Vec<Record>) -> Result<Uuid, SubmitError> {
        let id = Uuid::new_v4();
        let run = Run::new(
            id,
            ExecutionMode::Async,
            pipeline.recipe().clone(),
            pipeline.resolved_recipe().clone(),
            pipeline.descriptors(),
        );

        let (handle, signal) = CancelSignal::pair();
        self.tracker.register(run, Some(handle))?;

        let tracker = Arc::clone(&self.tracker);
        let permits = Arc::clone(&self.permits);
        let stage_timeout = self.config.stage_timeout;

        tokio::spawn(async move {
            let mut waiter = signal.clone();
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!("Run {} could not acquire a slot: {}", id, e);
                        return;
                    }
                },
                _ = waiter.canceled() => {
                    debug!("Run {} canceled while waiting for a slot", id);
                    return;
                }
            };

            if let Err(e) = tracker.update(id, Transition::Start) {
                // Canceled or evicted between the slot and the start
                debug!("Run {} not started: {}", id, e);
                return;
            }
            info!("Run {} started (async, {} stages)", id, pipeline.stage_count());

            let transition = match execute(&pipeline, id, inputs, &signal, stage_timeout).await {
                Ok(output) => Transition::Succeed(output),
                Err(RunFailure::Stage(error)) => Transition::Fail(error),
                Err(RunFailure::Canceled) => Transition::Cancel,
            };

            match tracker.update(id, transition) {
                Ok(state) => info!("Run {} completed with state {:?}", id, state),
                Err(e) => warn!("Failed to record outcome of run {}: {}", id, e),
            }
        });

        debug!("Run {} accepted", id);
        Ok(id)
    }

    /// Snapshot of a tracked run
    pub fn poll(&self, id: Uuid) -> Result<Run, TrackerError> {
        self.tracker.get(id)
    }

    /// Best-effort cancellation; returns the state right after the request
    pub fn cancel(&self, id: Uuid) -> Result<RunState, TrackerError> {
        self.tracker.request_cancel(id)
    }

    /// All tracked runs, most recent first
    pub fn runs(&self) -> Vec<Run> {
        self.tracker.list()
    }

    /// Starts the periodic retention sweep
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let tracker = Arc::clone(&self.tracker);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                tracker.sweep(Utc::now());
            }
        })
    }
}

fn apply(run: &mut Run, transition: Transition) -> Result<(), SubmitError> {
    let id = run.id;
    run.apply(transition)
        .map_err(|source| TrackerError::InvalidTransition { id, source }.into())
}
