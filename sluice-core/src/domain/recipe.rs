//! Recipe domain types

use serde::{Deserialize, Serialize};

/// Declarative description of a pipeline
///
/// References are kept as submitted (resource names or permalinks).
/// Parsing and resolution happen in the engine's validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub source: String,
    pub model_instances: Vec<String>,
    pub destination: String,
}

impl Recipe {
    pub fn new(
        source: impl Into<String>,
        model_instances: Vec<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            model_instances,
            destination: destination.into(),
        }
    }

    /// Number of stages a pipeline built from this recipe will have
    pub fn stage_count(&self) -> usize {
        self.model_instances.len() + 2
    }
}

/// How the caller receives the outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// The caller blocks until the run is terminal
    #[serde(alias = "sync")]
    Sync,
    /// The caller receives a run id and polls for the outcome
    #[serde(alias = "async")]
    Async,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Sync => write!(f, "sync"),
            ExecutionMode::Async => write!(f, "async"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(ExecutionMode::Sync),
            "async" => Ok(ExecutionMode::Async),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}
