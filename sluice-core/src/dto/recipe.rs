//! Recipe DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::recipe::{ExecutionMode, Recipe};
use crate::domain::record::Record;
use crate::domain::run::{RunOutput, RunState, StageDescriptor};

/// Request to trigger a recipe
///
/// When `mode` is omitted the orchestrator infers it from the connectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecipe {
    pub recipe: Recipe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    #[serde(default)]
    pub inputs: Vec<Record>,
}

/// Response of a synchronous trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSyncResponse {
    pub run_id: Uuid,
    pub state: RunState,
    pub result: RunOutput,
}

/// Response of an asynchronous trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAsyncResponse {
    pub run_id: Uuid,
}

/// Either trigger response; the sync variant is tried first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerResponse {
    Sync(TriggerSyncResponse),
    Async(TriggerAsyncResponse),
}

impl TriggerResponse {
    pub fn run_id(&self) -> Uuid {
        match self {
            TriggerResponse::Sync(resp) => resp.run_id,
            TriggerResponse::Async(resp) => resp.run_id,
        }
    }
}

/// Request to validate a recipe without running it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRecipe {
    pub recipe: Recipe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
}

/// Result of a successful validation and dry build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRecipeResponse {
    pub mode: ExecutionMode,
    pub resolved_recipe: Recipe,
    pub stages: Vec<StageDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_request_defaults() {
        let req: TriggerRecipe = serde_json::from_value(serde_json::json!({
            "recipe": {
                "source": "source-connectors/source-http",
                "model_instances": ["models/dummy-det/instances/latest"],
                "destination": "destination-connectors/destination-http"
            }
        }))
        .unwrap();

        assert!(req.mode.is_none());
        assert!(req.inputs.is_empty());
    }

    #[test]
    fn test_trigger_response_untagged() {
        let id = Uuid::new_v4();
        let resp: TriggerResponse =
            serde_json::from_value(serde_json::json!({ "run_id": id })).unwrap();
        assert!(matches!(resp, TriggerResponse::Async(_)));
        assert_eq!(resp.run_id(), id);

        let resp: TriggerResponse = serde_json::from_value(serde_json::json!({
            "run_id": id,
            "state": "SUCCEEDED",
            "result": { "records": [], "committed": 0 }
        }))
        .unwrap();
        assert!(matches!(resp, TriggerResponse::Sync(_)));
    }
}
