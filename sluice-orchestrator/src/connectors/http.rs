//! HTTP directness connectors
//!
//! Data travels inline with the trigger request: the source yields the
//! request's inputs and the destination hands the committed records back in
//! the acknowledgement, which becomes the sync response payload.

use async_trait::async_trait;
use sluice_core::domain::record::Record;
use sluice_engine::{Ack, CapabilityError, DestinationConnector, SourceConnector, StageContext};

pub struct HttpSource;

#[async_trait]
impl SourceConnector for HttpSource {
    async fn fetch(
        &self,
        ctx: &StageContext,
        inputs: &[Record],
    ) -> Result<Vec<Record>, CapabilityError> {
        tracing::debug!("Run {}: http source yields {} input(s)", ctx.run_id, inputs.len());
        Ok(inputs.to_vec())
    }
}

pub struct HttpDestination;

#[async_trait]
impl DestinationConnector for HttpDestination {
    async fn commit(
        &self,
        _ctx: &StageContext,
        records: Vec<Record>,
    ) -> Result<Ack, CapabilityError> {
        let payload = serde_json::to_value(&records)
            .map_err(|e| CapabilityError::Rejected(format!("unserializable records: {}", e)))?;
        Ok(Ack::new(records.len()).with_payload(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_engine::CancelSignal;
    use uuid::Uuid;

    fn ctx() -> StageContext {
        StageContext {
            run_id: Uuid::new_v4(),
            stage_index: 0,
            cancel: CancelSignal::never(),
        }
    }

    #[tokio::test]
    async fn test_source_passes_inputs_through() {
        let inputs = vec![Record::new(json!({ "image": "dog.jpg" }))];
        let fetched = HttpSource.fetch(&ctx(), &inputs).await.unwrap();
        assert_eq!(fetched, inputs);
    }

    #[tokio::test]
    async fn test_destination_acks_with_records() {
        let records = vec![Record::new(json!({ "label": "dog" }))];
        let ack = HttpDestination.commit(&ctx(), records).await.unwrap();

        assert_eq!(ack.committed, 1);
        assert_eq!(ack.payload, Some(json!([{ "label": "dog" }])));
    }
}
