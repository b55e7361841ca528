//! Recipe API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use sluice_core::dto::recipe::{
    TriggerRecipe, TriggerResponse, ValidateRecipe, ValidateRecipeResponse,
};

impl OrchestratorClient {
    // =============================================================================
    // Recipes
    // =============================================================================

    /// Validate a recipe and report the stages it would build
    ///
    /// # Arguments
    /// * `req` - The recipe and optional mode override
    ///
    /// # Returns
    /// The inferred mode, the permalink form of the recipe, and its stages
    pub async fn validate_recipe(&self, req: ValidateRecipe) -> Result<ValidateRecipeResponse> {
        let url = format!("{}/recipe/validate", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Trigger a recipe
    ///
    /// Sync recipes return once the run is terminal; async recipes return
    /// as soon as the run is accepted.
    ///
    /// # Arguments
    /// * `req` - The recipe, optional mode override, and input records
    ///
    /// # Returns
    /// The run result for sync runs, or the run ID to poll for async runs
    ///
    /// # Example
    /// ```no_run
    /// # use sluice_client::OrchestratorClient;
    /// # use sluice_core::dto::recipe::{TriggerRecipe, TriggerResponse};
    /// # async fn example(req: TriggerRecipe) -> sluice_client::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// match client.trigger(req).await? {
    ///     TriggerResponse::Sync(resp) => println!("committed {}", resp.result.committed),
    ///     TriggerResponse::Async(resp) => println!("poll {}", resp.run_id),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn trigger(&self, req: TriggerRecipe) -> Result<TriggerResponse> {
        let url = format!("{}/recipe/trigger", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
