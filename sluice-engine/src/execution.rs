//! Stage execution
//!
//! Drives a built pipeline from source to destination. Stages run strictly
//! in chain order and the output of stage `i` is the only input of stage
//! `i + 1`. The first failure stops the chain.

use std::future::Future;
use std::time::Duration;

use sluice_core::domain::record::Record;
use sluice_core::domain::run::{
    RunOutput, StageDescriptor, StageError, StageErrorKind, StageKind,
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::builder::{Pipeline, StageBinding};
use crate::capability::{CancelSignal, CapabilityError, StageContext};

/// Why a run did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("run was canceled")]
    Canceled,
}

/// Runs every stage of `pipeline` in order
///
/// Cancellation is checked before each stage and handed to each stage call.
/// A stage that has already started is allowed to finish; a destination
/// that completes its commit makes the run succeed.
pub async fn execute(
    pipeline: &Pipeline,
    run_id: Uuid,
    inputs: Vec<Record>,
    cancel: &CancelSignal,
    stage_timeout: Duration,
) -> Result<RunOutput, RunFailure> {
    let mut records = inputs;

    for stage in pipeline.stages() {
        if cancel.is_canceled() {
            debug!(
                "Run {} canceled before stage {} ({})",
                run_id, stage.descriptor.index, stage.descriptor.resolved
            );
            return Err(RunFailure::Canceled);
        }

        let ctx = StageContext {
            run_id,
            stage_index: stage.descriptor.index,
            cancel: cancel.clone(),
        };

        debug!(
            "Run {} stage {} ({}) with {} record(s)",
            run_id,
            stage.descriptor.index,
            stage.descriptor.resolved,
            records.len()
        );

        match &stage.binding {
            StageBinding::Source(source) => {
                let fetched = call(
                    &stage.descriptor,
                    StageErrorKind::Fetch,
                    stage_timeout,
                    cancel,
                    source.fetch(&ctx, &records),
                )
                .await?;
                records = fetched;
            }
            StageBinding::Model(model) => {
                let inputs = std::mem::take(&mut records);
                records = call(
                    &stage.descriptor,
                    StageErrorKind::Infer,
                    stage_timeout,
                    cancel,
                    model.infer(&ctx, inputs),
                )
                .await?;
            }
            StageBinding::Destination(destination) => {
                let ack = call(
                    &stage.descriptor,
                    StageErrorKind::Commit,
                    stage_timeout,
                    cancel,
                    destination.commit(&ctx, records.clone()),
                )
                .await?;

                return Ok(RunOutput {
                    records,
                    committed: ack.committed,
                    ack: ack.payload,
                });
            }
        }
    }

    // Pipelines always end with a destination stage
    Err(RunFailure::Stage(StageError {
        stage_index: pipeline.stage_count(),
        stage: String::new(),
        stage_kind: StageKind::Destination,
        kind: StageErrorKind::Commit,
        cause: "pipeline has no destination stage".to_string(),
    }))
}

/// Awaits one capability call under its deadline
async fn call<T>(
    descriptor: &StageDescriptor,
    kind: StageErrorKind,
    deadline: Duration,
    cancel: &CancelSignal,
    fut: impl Future<Output = Result<T, CapabilityError>>,
) -> Result<T, RunFailure> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(CapabilityError::Interrupted)) if cancel.is_canceled() => Err(RunFailure::Canceled),
        Ok(Err(err)) => {
            warn!(
                "Stage {} ({}) failed during {}: {}",
                descriptor.index, descriptor.resolved, kind, err
            );
            Err(stage_error(descriptor, kind, err.to_string()).into())
        }
        Err(_) => {
            warn!(
                "Stage {} ({}) exceeded its deadline of {:?}",
                descriptor.index, descriptor.resolved, deadline
            );
            Err(stage_error(
                descriptor,
                StageErrorKind::Timeout,
                format!("{} did not complete within {:?}", kind, deadline),
            )
            .into())
        }
    }
}

fn stage_error(descriptor: &StageDescriptor, kind: StageErrorKind, cause: String) -> StageError {
    StageError {
        stage_index: descriptor.index,
        stage: descriptor.resolved.clone(),
        stage_kind: descriptor.kind,
        kind,
        cause,
    }
}
