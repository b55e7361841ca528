//! Echo model instance
//!
//! Returns every input wrapped with the model and instance that produced it.

use async_trait::async_trait;
use serde_json::json;
use sluice_core::domain::record::Record;
use sluice_engine::{CapabilityError, ModelInstance, StageContext};

pub struct EchoModel {
    model_id: String,
    tag: String,
}

impl EchoModel {
    pub fn new(model_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            tag: tag.into(),
        }
    }
}

#[async_trait]
impl ModelInstance for EchoModel {
    async fn infer(
        &self,
        _ctx: &StageContext,
        inputs: Vec<Record>,
    ) -> Result<Vec<Record>, CapabilityError> {
        Ok(inputs
            .into_iter()
            .map(|input| {
                Record::new(json!({
                    "model": self.model_id,
                    "instance": self.tag,
                    "input": input.into_inner(),
                }))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_engine::CancelSignal;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_echo_tags_inputs() {
        let ctx = StageContext {
            run_id: Uuid::new_v4(),
            stage_index: 1,
            cancel: CancelSignal::never(),
        };
        let outputs = EchoModel::new("dummy-det", "v1")
            .infer(&ctx, vec![Record::new(json!(7))])
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![Record::new(json!({ "model": "dummy-det", "instance": "v1", "input": 7 }))]
        );
    }
}
