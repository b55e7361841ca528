//! Capability contracts consumed by the engine
//!
//! Connectors and model instances are external collaborators. The engine only
//! sees them through these traits, resolved from the registries by reference.
//! Every call is a suspension point; the engine never holds a lock across one.

use async_trait::async_trait;
use sluice_core::domain::record::Record;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Error returned by a capability call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The backing transport or model server could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The call reached its target but was refused
    #[error("rejected: {0}")]
    Rejected(String),

    /// The call stopped early after observing a cancellation request
    #[error("interrupted by cancellation")]
    Interrupted,
}

/// Acknowledgement returned by a destination commit
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub committed: usize,
    pub payload: Option<serde_json::Value>,
}

impl Ack {
    pub fn new(committed: usize) -> Self {
        Self {
            committed,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Sending half of a run's cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_canceled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving half of a run's cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Creates a linked handle/signal pair
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = Self::pair();
        signal
    }

    pub fn is_canceled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    ///
    /// Never resolves if the handle was dropped without cancelling.
    pub async fn canceled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Per-call context handed to every capability
#[derive(Debug, Clone)]
pub struct StageContext {
    pub run_id: Uuid,
    pub stage_index: usize,
    /// Capabilities that can stop between units of work should poll this
    pub cancel: CancelSignal,
}

/// Source connector: produces the records a run starts from
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Fetches a finite batch of records
    ///
    /// Each invocation starts over; `inputs` are the records supplied with
    /// the trigger request, which directness sources pass through.
    async fn fetch(
        &self,
        ctx: &StageContext,
        inputs: &[Record],
    ) -> Result<Vec<Record>, CapabilityError>;
}

/// Destination connector: commits the records produced by the last model
#[async_trait]
pub trait DestinationConnector: Send + Sync {
    async fn commit(
        &self,
        ctx: &StageContext,
        records: Vec<Record>,
    ) -> Result<Ack, CapabilityError>;
}

/// Deployed model instance able to run inference
#[async_trait]
pub trait ModelInstance: Send + Sync {
    /// Runs inference, returning one prediction record per output
    async fn infer(
        &self,
        ctx: &StageContext,
        inputs: Vec<Record>,
    ) -> Result<Vec<Record>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_pair() {
        let (handle, signal) = CancelSignal::pair();
        assert!(!signal.is_canceled());

        handle.cancel();
        handle.cancel();
        assert!(signal.is_canceled());
        assert!(handle.is_canceled());
    }

    #[test]
    fn test_never_signal() {
        let signal = CancelSignal::never();
        assert!(!signal.is_canceled());
    }

    #[tokio::test]
    async fn test_canceled_wakes_waiter() {
        let (handle, mut signal) = CancelSignal::pair();

        let waiter = tokio::spawn(async move {
            signal.canceled().await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake up")
            .unwrap();
    }

    #[tokio::test]
    async fn test_canceled_pends_when_handle_dropped() {
        let mut signal = CancelSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.canceled()).await;
        assert!(waited.is_err());
    }
}
