//! Sluice execution engine
//!
//! Validates recipes against the connector and model instance registries,
//! builds them into pipelines and executes those pipelines synchronously or
//! asynchronously.

pub mod builder;
pub mod capability;
pub mod config;
pub mod engine;
pub mod execution;
pub mod mode;
pub mod permalink;
pub mod registry;
pub mod tracker;
pub mod validator;

pub use builder::{BuildError, Pipeline, PipelineBuilder};
pub use capability::{
    Ack, CancelHandle, CancelSignal, CapabilityError, DestinationConnector, ModelInstance,
    SourceConnector, StageContext,
};
pub use config::EngineConfig;
pub use engine::{Engine, Prepared, SubmitError, SubmitOutcome};
pub use registry::{ConnectorRegistry, ModelInstanceRegistry, RegistryError};
pub use tracker::{RunTracker, TrackerError};
pub use validator::{RecipeValidator, ValidatedRecipe, ValidationError, ValidationErrorKind};
