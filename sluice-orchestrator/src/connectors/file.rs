//! File destination
//!
//! Appends every committed record to a file as one JSON document per line.

use std::path::PathBuf;

use async_trait::async_trait;
use sluice_core::domain::record::Record;
use sluice_engine::{Ack, CapabilityError, DestinationConnector, StageContext};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

pub struct FileDestination {
    path: PathBuf,
}

impl FileDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DestinationConnector for FileDestination {
    async fn commit(
        &self,
        ctx: &StageContext,
        records: Vec<Record>,
    ) -> Result<Ack, CapabilityError> {
        let mut buf = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| CapabilityError::Rejected(format!("unserializable record: {}", e)))?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                CapabilityError::Transport(format!("open {}: {}", self.path.display(), e))
            })?;

        // Single write so a run's records stay contiguous
        file.write_all(&buf).await.map_err(|e| {
            CapabilityError::Transport(format!("write {}: {}", self.path.display(), e))
        })?;
        file.flush()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;

        tracing::debug!(
            "Run {}: appended {} record(s) to {}",
            ctx.run_id,
            records.len(),
            self.path.display()
        );

        Ok(Ack::new(records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_engine::CancelSignal;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_appends_json_lines() {
        let path = std::env::temp_dir().join(format!("sluice-file-dst-{}.jsonl", Uuid::new_v4()));
        let destination = FileDestination::new(&path);
        let ctx = StageContext {
            run_id: Uuid::new_v4(),
            stage_index: 2,
            cancel: CancelSignal::never(),
        };

        destination
            .commit(&ctx, vec![Record::new(json!({ "n": 1 }))])
            .await
            .unwrap();
        let ack = destination
            .commit(
                &ctx,
                vec![Record::new(json!({ "n": 2 })), Record::new(json!({ "n": 3 }))],
            )
            .await
            .unwrap();
        assert_eq!(ack.committed, 2);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#]);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
