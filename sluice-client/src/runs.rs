//! Run API endpoints

use std::time::Duration;

use crate::OrchestratorClient;
use crate::error::{ClientError, Result};
use sluice_core::domain::run::Run;
use sluice_core::dto::run::{CancelRunResponse, RunSummary};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Run Queries
    // =============================================================================

    /// Get a run by ID
    ///
    /// # Arguments
    /// * `run_id` - The run UUID
    ///
    /// # Returns
    /// The run, including its result or error once terminal
    pub async fn get_run(&self, run_id: Uuid) -> Result<Run> {
        let url = format!("{}/run/{}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all tracked runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let url = format!("{}/run/list", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Run Control
    // =============================================================================

    /// Request cancellation of a run
    ///
    /// Pending runs are canceled at once. Running runs stop before their
    /// next stage. Terminal runs are left as they are.
    ///
    /// # Arguments
    /// * `run_id` - The run UUID
    ///
    /// # Returns
    /// The state observed right after the request
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<CancelRunResponse> {
        let url = format!("{}/run/{}", self.base_url, run_id);
        let response = self.client.delete(&url).send().await?;

        self.handle_response(response).await
    }

    /// Poll a run until it reaches a terminal state
    ///
    /// # Arguments
    /// * `run_id` - The run UUID
    /// * `interval` - Delay between polls
    /// * `timeout` - Give up after this long
    ///
    /// # Returns
    /// The terminal run
    pub async fn wait_for_run(
        &self,
        run_id: Uuid,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Run> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let run = self.get_run(run_id).await?;
            if run.state.is_terminal() {
                return Ok(run);
            }

            if tokio::time::Instant::now() + interval > deadline {
                return Err(ClientError::Timeout(format!(
                    "run {} still {:?} after {:?}",
                    run_id, run.state, timeout
                )));
            }

            tracing::debug!("Run {} is {:?}, polling again", run_id, run.state);
            tokio::time::sleep(interval).await;
        }
    }
}
