//! Connector and model catalog
//!
//! The catalog is the administrative side channel of the orchestrator: a
//! JSON file loaded at startup that declares every connector and model
//! instance and registers them into the engine's registries.
//!
//! ```json
//! {
//!   "sources": [
//!     { "id": "source-http", "definition": "source-http", "kind": "http",
//!       "connection_type": "directness" }
//!   ],
//!   "destinations": [
//!     { "id": "destination-http", "definition": "destination-http", "kind": "http",
//!       "connection_type": "directness" },
//!     { "id": "dst-csv", "definition": "destination-csv", "kind": "file",
//!       "path": "out.jsonl", "connection_type": "file" }
//!   ],
//!   "models": [
//!     { "id": "dummy-det", "instances": [
//!       { "tag": "v1", "aliases": ["latest"], "kind": "remote",
//!         "endpoint": "http://localhost:9000/infer" }
//!     ] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sluice_core::domain::resource::{ConnectionType, ResourceState};
use sluice_engine::registry::{DestinationEntry, InstanceEntry, SourceEntry};
use sluice_engine::{
    ConnectorRegistry, DestinationConnector, ModelInstance, ModelInstanceRegistry, RegistryError,
    SourceConnector,
};
use thiserror::Error;
use uuid::Uuid;

use crate::connectors::{FileDestination, HttpDestination, HttpSource};
use crate::models::{EchoModel, RemoteModel};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("catalog entry rejected: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub destinations: Vec<DestinationSpec>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    #[serde(default)]
    pub uid: Option<Uuid>,
    pub definition: String,
    #[serde(default)]
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub state: ResourceState,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSpec {
    pub id: String,
    #[serde(default)]
    pub uid: Option<Uuid>,
    pub definition: String,
    #[serde(default)]
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub state: ResourceState,
    #[serde(flatten)]
    pub kind: DestinationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestinationKind {
    Http,
    File { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(default)]
    pub instances: Vec<InstanceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub tag: String,
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub state: ResourceState,
    #[serde(flatten)]
    pub kind: InstanceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstanceKind {
    Remote { endpoint: String },
    Echo,
}

/// Counts of what a catalog registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loaded {
    pub sources: usize,
    pub destinations: usize,
    pub instances: usize,
}

impl Catalog {
    /// Reads a catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Registers every entry; stops at the first rejected entry
    pub fn register(
        &self,
        connectors: &ConnectorRegistry,
        models: &ModelInstanceRegistry,
    ) -> Result<Loaded, CatalogError> {
        for spec in &self.sources {
            let handle: Arc<dyn SourceConnector> = match spec.kind {
                SourceKind::Http => Arc::new(HttpSource),
            };
            let mut entry =
                SourceEntry::new(&spec.id, &spec.definition, spec.connection_type, handle)
                    .with_state(spec.state);
            if let Some(uid) = spec.uid {
                entry = entry.with_uid(uid);
            }
            connectors.register_source(entry)?;
        }

        for spec in &self.destinations {
            let handle: Arc<dyn DestinationConnector> = match &spec.kind {
                DestinationKind::Http => Arc::new(HttpDestination),
                DestinationKind::File { path } => Arc::new(FileDestination::new(path)),
            };
            let mut entry =
                DestinationEntry::new(&spec.id, &spec.definition, spec.connection_type, handle)
                    .with_state(spec.state);
            if let Some(uid) = spec.uid {
                entry = entry.with_uid(uid);
            }
            connectors.register_destination(entry)?;
        }

        let client = reqwest::Client::new();
        let mut instances = 0;
        for model in &self.models {
            models.register_model(&model.id, model.uid.unwrap_or_else(Uuid::new_v4))?;

            for spec in &model.instances {
                let handle: Arc<dyn ModelInstance> = match &spec.kind {
                    InstanceKind::Remote { endpoint } => {
                        Arc::new(RemoteModel::new(endpoint, client.clone()))
                    }
                    InstanceKind::Echo => Arc::new(EchoModel::new(&model.id, &spec.tag)),
                };

                let mut entry = InstanceEntry::new(&spec.tag, handle).with_state(spec.state);
                if let Some(uid) = spec.uid {
                    entry = entry.with_uid(uid);
                }
                for alias in &spec.aliases {
                    entry = entry.with_alias(alias);
                }

                models.register_instance(&model.id, entry)?;
                instances += 1;
            }
        }

        Ok(Loaded {
            sources: self.sources.len(),
            destinations: self.destinations.len(),
            instances,
        })
    }
}
