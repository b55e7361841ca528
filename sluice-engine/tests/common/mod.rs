//! Shared fixtures for engine integration tests
//!
//! In-memory connectors and model instances that record every call, plus
//! the recipes used by the detection-model scenarios.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sluice_core::domain::recipe::Recipe;
use sluice_core::domain::record::Record;
use sluice_core::domain::resource::ConnectionType;
use sluice_engine::registry::{DestinationEntry, InstanceEntry, SourceEntry};
use sluice_engine::{
    Ack, CapabilityError, ConnectorRegistry, DestinationConnector, Engine, EngineConfig,
    ModelInstance, ModelInstanceRegistry, SourceConnector, StageContext,
};
use uuid::Uuid;

pub const MODEL_ID: &str = "dummy-det";
pub const MODEL_INSTANCE_ID: &str = "latest";
pub const DST_CSV_CONN_ID: &str = "some-cool-name-for-dst-csv-connector";

/// Sync detection recipe: http source to http destination
pub fn det_sync_recipe() -> Recipe {
    Recipe::new(
        "source-connectors/source-http",
        vec![format!("models/{}/instances/{}", MODEL_ID, MODEL_INSTANCE_ID)],
        "destination-connectors/destination-http",
    )
}

/// Async detection recipe: http source to a CSV destination
pub fn det_async_recipe() -> Recipe {
    Recipe::new(
        "source-connectors/source-http",
        vec![format!("models/{}/instances/{}", MODEL_ID, MODEL_INSTANCE_ID)],
        format!("destination-connectors/{}", DST_CSV_CONN_ID),
    )
}

pub fn image_record() -> Record {
    Record::new(json!({ "image": "dog.jpg" }))
}

/// Ordered log of capability calls, shared by all mocks of a harness
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.entries().iter().any(|e| e.starts_with(prefix))
    }
}

/// Passes trigger inputs through, or fails every fetch
pub struct MockSource {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl SourceConnector for MockSource {
    async fn fetch(
        &self,
        _ctx: &StageContext,
        inputs: &[Record],
    ) -> Result<Vec<Record>, CapabilityError> {
        self.log.push("fetch");
        if self.fail {
            return Err(CapabilityError::Transport("connection refused".to_string()));
        }
        Ok(inputs.to_vec())
    }
}

/// Behaviour of a mock model instance
#[derive(Clone, Copy)]
pub enum Behavior {
    Predict,
    Fail,
    Slow(Duration),
}

/// Emits one detection per input record
pub struct MockModel {
    pub name: String,
    pub log: CallLog,
    pub behavior: Behavior,
    pub received: Mutex<Vec<Record>>,
}

impl MockModel {
    pub fn new(name: impl Into<String>, log: CallLog, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            log,
            behavior,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Every record handed to `infer`, in order
    pub fn received(&self) -> Vec<Record> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInstance for MockModel {
    async fn infer(
        &self,
        _ctx: &StageContext,
        inputs: Vec<Record>,
    ) -> Result<Vec<Record>, CapabilityError> {
        self.log.push(format!("infer:{}", self.name));
        self.received.lock().unwrap().extend(inputs.iter().cloned());

        match self.behavior {
            Behavior::Fail => {
                return Err(CapabilityError::Rejected("model server returned 500".to_string()));
            }
            Behavior::Slow(delay) => tokio::time::sleep(delay).await,
            Behavior::Predict => {}
        }

        Ok(inputs
            .into_iter()
            .map(|input| {
                Record::new(json!({
                    "model": self.name,
                    "input": input.into_inner(),
                    "detections": [{ "category": "dog", "score": 0.98 }]
                }))
            })
            .collect())
    }
}

/// Stores committed records, optionally after a delay
pub struct MockDestination {
    pub name: String,
    pub log: CallLog,
    pub delay: Option<Duration>,
    pub committed: Mutex<Vec<Record>>,
}

impl MockDestination {
    pub fn new(name: impl Into<String>, log: CallLog, delay: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            log,
            delay,
            committed: Mutex::new(Vec::new()),
        }
    }

    pub fn committed(&self) -> Vec<Record> {
        self.committed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationConnector for MockDestination {
    async fn commit(
        &self,
        _ctx: &StageContext,
        records: Vec<Record>,
    ) -> Result<Ack, CapabilityError> {
        self.log.push(format!("commit:{}", self.name));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let count = records.len();
        self.committed.lock().unwrap().extend(records);
        Ok(Ack::new(count))
    }
}

/// An engine wired to mock registries
pub struct Harness {
    pub engine: Engine,
    pub log: CallLog,
    pub http_destination: Arc<MockDestination>,
    pub csv_destination: Arc<MockDestination>,
}

impl Harness {
    /// Registers `dummy-det` v1 (aliased `latest`) with the given behaviour
    pub fn new(config: EngineConfig, behavior: Behavior) -> Self {
        let log = CallLog::default();

        let connectors = ConnectorRegistry::new();
        connectors
            .register_source(SourceEntry::new(
                "source-http",
                "source-http",
                ConnectionType::Directness,
                Arc::new(MockSource {
                    log: log.clone(),
                    fail: false,
                }),
            ))
            .unwrap();

        let http_destination = Arc::new(MockDestination::new(
            "destination-http",
            log.clone(),
            None,
        ));
        connectors
            .register_destination(DestinationEntry::new(
                "destination-http",
                "destination-http",
                ConnectionType::Directness,
                http_destination.clone(),
            ))
            .unwrap();

        let csv_destination = Arc::new(MockDestination::new(DST_CSV_CONN_ID, log.clone(), None));
        connectors
            .register_destination(DestinationEntry::new(
                DST_CSV_CONN_ID,
                "destination-csv",
                ConnectionType::File,
                csv_destination.clone(),
            ))
            .unwrap();

        let models = ModelInstanceRegistry::new();
        models.register_model(MODEL_ID, Uuid::new_v4()).unwrap();
        models
            .register_instance(
                MODEL_ID,
                InstanceEntry::new(
                    "v1",
                    Arc::new(MockModel::new(format!("{}/v1", MODEL_ID), log.clone(), behavior)),
                )
                .with_alias(MODEL_INSTANCE_ID),
            )
            .unwrap();

        Self {
            engine: Engine::new(config, Arc::new(connectors), Arc::new(models)),
            log,
            http_destination,
            csv_destination,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), Behavior::Predict)
    }

    /// Adds another concrete instance of `dummy-det`
    pub fn add_instance(&self, tag: &str, behavior: Behavior) {
        self.engine
            .models()
            .register_instance(
                MODEL_ID,
                InstanceEntry::new(
                    tag,
                    Arc::new(MockModel::new(
                        format!("{}/{}", MODEL_ID, tag),
                        self.log.clone(),
                        behavior,
                    )),
                ),
            )
            .unwrap();
    }

    /// Registers a new model with one instance and returns the instance
    pub fn add_model(&self, model_id: &str, tag: &str, behavior: Behavior) -> Arc<MockModel> {
        let model = Arc::new(MockModel::new(
            format!("{}/{}", model_id, tag),
            self.log.clone(),
            behavior,
        ));

        let models = self.engine.models();
        models.register_model(model_id, Uuid::new_v4()).unwrap();
        models
            .register_instance(model_id, InstanceEntry::new(tag, model.clone()))
            .unwrap();
        model
    }

    /// Registers an http-family source whose fetch always fails
    pub fn add_failing_source(&self, id: &str) {
        self.engine
            .connectors()
            .register_source(SourceEntry::new(
                id,
                "source-http",
                ConnectionType::Directness,
                Arc::new(MockSource {
                    log: self.log.clone(),
                    fail: true,
                }),
            ))
            .unwrap();
    }

    /// Registers an http-family destination whose commit takes `delay`
    pub fn add_slow_destination(&self, id: &str, delay: Duration) -> Arc<MockDestination> {
        let destination = Arc::new(MockDestination::new(id, self.log.clone(), Some(delay)));
        self.engine
            .connectors()
            .register_destination(DestinationEntry::new(
                id,
                "destination-http",
                ConnectionType::Directness,
                destination.clone(),
            ))
            .unwrap();
        destination
    }
}
