//! Remote model instance
//!
//! Calls an HTTP inference endpoint:
//! `POST {endpoint}` with `{"inputs": [...]}`, answered by `{"outputs": [...]}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sluice_core::domain::record::Record;
use sluice_engine::{CapabilityError, ModelInstance, StageContext};

#[derive(Serialize)]
struct InferRequest<'a> {
    inputs: &'a [Record],
}

#[derive(Deserialize)]
struct InferResponse {
    outputs: Vec<Record>,
}

pub struct RemoteModel {
    endpoint: String,
    client: Client,
}

impl RemoteModel {
    pub fn new(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelInstance for RemoteModel {
    async fn infer(
        &self,
        ctx: &StageContext,
        inputs: Vec<Record>,
    ) -> Result<Vec<Record>, CapabilityError> {
        tracing::debug!(
            "Run {}: POST {} with {} input(s)",
            ctx.run_id,
            self.endpoint,
            inputs.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&InferRequest { inputs: &inputs })
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CapabilityError::Rejected(format!(
                "inference endpoint returned {}: {}",
                status, body
            )));
        }

        let body: InferResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Rejected(format!("malformed inference response: {}", e)))?;

        Ok(body.outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let inputs = vec![Record::new(json!({ "image": "dog.jpg" }))];
        let body = serde_json::to_value(InferRequest { inputs: &inputs }).unwrap();
        assert_eq!(body, json!({ "inputs": [{ "image": "dog.jpg" }] }));
    }

    #[test]
    fn test_response_shape() {
        let body: InferResponse = serde_json::from_value(json!({
            "outputs": [{ "detections": [{ "category": "dog", "score": 0.98 }] }]
        }))
        .unwrap();
        assert_eq!(body.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let model = RemoteModel::new("http://127.0.0.1:9/infer", Client::new());
        let ctx = StageContext {
            run_id: uuid::Uuid::new_v4(),
            stage_index: 1,
            cancel: sluice_engine::CancelSignal::never(),
        };

        let err = model.infer(&ctx, vec![]).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Transport(_)));
    }
}
