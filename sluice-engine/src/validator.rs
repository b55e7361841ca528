//! Recipe validation
//!
//! Structural and referential checks run in a fixed order and stop at the
//! first failure:
//! 1. `source` and `destination` are well-formed names in their collection
//! 2. `model_instances` is non-empty and every entry parses
//! 3. every reference exists in its registry (liveness is checked at build)

use std::sync::Arc;

use sluice_core::domain::recipe::Recipe;
use sluice_core::domain::resource::{ConnectorRef, ConnectorRole, ModelInstanceRef};
use thiserror::Error;
use tracing::debug;

use crate::registry::{ConnectorRegistry, ModelInstanceRegistry};

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The reference does not parse or is in the wrong collection
    Malformed,
    /// A required list is empty
    Empty,
    /// The reference is not registered
    NotFound,
    /// The execution mode cannot be derived from the connectors
    Mode,
}

/// Recipe rejected before any stage ran
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid recipe at '{field}': {message}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `model_instances[1]`
    pub field: String,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        kind: ValidationErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// A recipe whose references parsed and exist
#[derive(Debug, Clone)]
pub struct ValidatedRecipe {
    recipe: Recipe,
    source: ConnectorRef,
    model_instances: Vec<ModelInstanceRef>,
    destination: ConnectorRef,
}

impl ValidatedRecipe {
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn source(&self) -> &ConnectorRef {
        &self.source
    }

    pub fn model_instances(&self) -> &[ModelInstanceRef] {
        &self.model_instances
    }

    pub fn destination(&self) -> &ConnectorRef {
        &self.destination
    }
}

/// Validates recipes against the registries
#[derive(Clone)]
pub struct RecipeValidator {
    connectors: Arc<ConnectorRegistry>,
    models: Arc<ModelInstanceRegistry>,
}

impl RecipeValidator {
    pub fn new(connectors: Arc<ConnectorRegistry>, models: Arc<ModelInstanceRegistry>) -> Self {
        Self { connectors, models }
    }

    pub fn validate(&self, recipe: &Recipe) -> Result<ValidatedRecipe, ValidationError> {
        // 1. connector names
        let source = parse_connector("source", &recipe.source, ConnectorRole::Source)?;
        let destination = parse_connector(
            "destination",
            &recipe.destination,
            ConnectorRole::Destination,
        )?;

        // 2. model instance names
        if recipe.model_instances.is_empty() {
            return Err(ValidationError::new(
                "model_instances",
                ValidationErrorKind::Empty,
                "at least one model instance is required",
            ));
        }

        let model_instances = recipe
            .model_instances
            .iter()
            .enumerate()
            .map(|(i, name)| {
                ModelInstanceRef::parse(name).map_err(|e| {
                    ValidationError::new(
                        format!("model_instances[{}]", i),
                        ValidationErrorKind::Malformed,
                        e.to_string(),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // 3. existence, in declaration order
        if !self.connectors.contains(&source) {
            return Err(not_found("source", source.name()));
        }

        for (i, reference) in model_instances.iter().enumerate() {
            if !self.models.contains(reference) {
                return Err(not_found(
                    format!("model_instances[{}]", i),
                    reference.name(),
                ));
            }
        }

        if !self.connectors.contains(&destination) {
            return Err(not_found("destination", destination.name()));
        }

        debug!(
            "Validated recipe {} -> {} model(s) -> {}",
            source,
            model_instances.len(),
            destination
        );

        Ok(ValidatedRecipe {
            recipe: recipe.clone(),
            source,
            model_instances,
            destination,
        })
    }
}

fn parse_connector(
    field: &str,
    name: &str,
    role: ConnectorRole,
) -> Result<ConnectorRef, ValidationError> {
    ConnectorRef::parse(name, role)
        .map_err(|e| ValidationError::new(field, ValidationErrorKind::Malformed, e.to_string()))
}

fn not_found(field: impl Into<String>, name: String) -> ValidationError {
    ValidationError::new(
        field,
        ValidationErrorKind::NotFound,
        format!("{} is not registered", name),
    )
}
