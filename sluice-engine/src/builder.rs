//! Pipeline builder
//!
//! Turns a validated recipe into an executable chain of bound stages:
//! source, one stage per model instance in declaration order, destination.
//! Symbolic tags are resolved here and the resulting handles are frozen
//! into the pipeline.

use std::sync::Arc;

use sluice_core::domain::recipe::Recipe;
use sluice_core::domain::run::{StageDescriptor, StageKind};
use thiserror::Error;
use tracing::debug;

use crate::capability::{DestinationConnector, ModelInstance, SourceConnector};
use crate::registry::{ConnectorRegistry, ModelInstanceRegistry, RegistryError};
use crate::validator::ValidatedRecipe;

/// Failure to bind a validated recipe
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("tag '{tag}' of model '{model_id}' at '{field}' does not resolve to any version")]
    UnresolvedTag {
        field: String,
        model_id: String,
        tag: String,
    },

    #[error(
        "tag '{tag}' of model '{model_id}' at '{field}' resolves to multiple versions: {}",
        candidates.join(", ")
    )]
    AmbiguousTag {
        field: String,
        model_id: String,
        tag: String,
        candidates: Vec<String>,
    },

    #[error("{name} at '{field}' is unavailable")]
    Unavailable { field: String, name: String },

    /// The reference was deregistered after validation
    #[error("{name} at '{field}' is no longer registered")]
    Missing { field: String, name: String },
}

impl BuildError {
    /// Recipe field the error refers to
    pub fn field(&self) -> &str {
        match self {
            BuildError::UnresolvedTag { field, .. }
            | BuildError::AmbiguousTag { field, .. }
            | BuildError::Unavailable { field, .. }
            | BuildError::Missing { field, .. } => field,
        }
    }

    fn from_registry(field: impl Into<String>, err: RegistryError) -> Self {
        let field = field.into();
        match err {
            RegistryError::UnresolvedTag { model_id, tag } => BuildError::UnresolvedTag {
                field,
                model_id,
                tag,
            },
            RegistryError::AmbiguousTag {
                model_id,
                tag,
                candidates,
            } => BuildError::AmbiguousTag {
                field,
                model_id,
                tag,
                candidates,
            },
            RegistryError::Unavailable(name) => BuildError::Unavailable { field, name },
            RegistryError::NotFound(name) | RegistryError::AlreadyRegistered(name) => {
                BuildError::Missing { field, name }
            }
        }
    }
}

/// Capability bound to a stage
#[derive(Clone)]
pub enum StageBinding {
    Source(Arc<dyn SourceConnector>),
    Model(Arc<dyn ModelInstance>),
    Destination(Arc<dyn DestinationConnector>),
}

/// One bound stage of a pipeline
#[derive(Clone)]
pub struct Stage {
    pub descriptor: StageDescriptor,
    pub binding: StageBinding,
}

/// Executable chain built from a recipe
///
/// Owned by exactly one run.
pub struct Pipeline {
    recipe: Recipe,
    resolved_recipe: Recipe,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Recipe as submitted
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Recipe rewritten to the permalinks that were bound
    pub fn resolved_recipe(&self) -> &Recipe {
        &self.resolved_recipe
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn descriptors(&self) -> Vec<StageDescriptor> {
        self.stages.iter().map(|s| s.descriptor.clone()).collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("recipe", &self.recipe)
            .field("stages", &self.descriptors())
            .finish()
    }
}

/// Binds validated recipes to live handles
#[derive(Clone)]
pub struct PipelineBuilder {
    connectors: Arc<ConnectorRegistry>,
    models: Arc<ModelInstanceRegistry>,
}

impl PipelineBuilder {
    pub fn new(connectors: Arc<ConnectorRegistry>, models: Arc<ModelInstanceRegistry>) -> Self {
        Self { connectors, models }
    }

    pub fn build(&self, validated: &ValidatedRecipe) -> Result<Pipeline, BuildError> {
        let recipe = validated.recipe();
        let mut stages = Vec::with_capacity(recipe.stage_count());

        let source_ref = validated.source();
        let source = self
            .connectors
            .resolve_source(source_ref)
            .map_err(|e| BuildError::from_registry("source", e))?;
        let source_permalink = format!("{}/{}", source_ref.role.collection(), source.uid);

        stages.push(Stage {
            descriptor: StageDescriptor {
                index: 0,
                kind: StageKind::Source,
                name: recipe.source.clone(),
                resolved: source_ref.name(),
                permalink: source_permalink.clone(),
            },
            binding: StageBinding::Source(source.handle),
        });

        let mut model_permalinks = Vec::with_capacity(validated.model_instances().len());
        for (i, reference) in validated.model_instances().iter().enumerate() {
            let instance = self
                .models
                .resolve(reference)
                .map_err(|e| BuildError::from_registry(format!("model_instances[{}]", i), e))?;

            let permalink = instance.permalink();
            model_permalinks.push(permalink.clone());

            stages.push(Stage {
                descriptor: StageDescriptor {
                    index: i + 1,
                    kind: StageKind::Model,
                    name: recipe.model_instances[i].clone(),
                    resolved: instance.name(),
                    permalink,
                },
                binding: StageBinding::Model(instance.handle),
            });
        }

        let destination_ref = validated.destination();
        let destination = self
            .connectors
            .resolve_destination(destination_ref)
            .map_err(|e| BuildError::from_registry("destination", e))?;
        let destination_permalink =
            format!("{}/{}", destination_ref.role.collection(), destination.uid);

        stages.push(Stage {
            descriptor: StageDescriptor {
                index: stages.len(),
                kind: StageKind::Destination,
                name: recipe.destination.clone(),
                resolved: destination_ref.name(),
                permalink: destination_permalink.clone(),
            },
            binding: StageBinding::Destination(destination.handle),
        });

        debug!("Built pipeline with {} stages", stages.len());

        Ok(Pipeline {
            recipe: recipe.clone(),
            resolved_recipe: Recipe::new(source_permalink, model_permalinks, destination_permalink),
            stages,
        })
    }
}
