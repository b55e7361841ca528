//! Conversion between resource names and permalinks
//!
//! A permalink replaces every id of a resource name with the registry uid:
//! `source-connectors/{uid}`, `models/{model_uid}/instances/{instance_uid}`.
//! Names can be renamed or repointed; permalinks cannot.

use sluice_core::domain::recipe::Recipe;
use sluice_core::domain::resource::{
    ConnectorRef, ConnectorRole, INSTANCES, MODELS, ModelInstanceRef,
};
use uuid::Uuid;

use crate::registry::{ConnectorRegistry, ModelInstanceRegistry, RegistryError};

/// Rewrites a recipe of resource names into permalinks
///
/// Aliases are resolved to the instance they currently point at.
pub fn to_permalinks(
    recipe: &Recipe,
    connectors: &ConnectorRegistry,
    models: &ModelInstanceRegistry,
) -> Result<Recipe, RegistryError> {
    let source = connector_permalink(&recipe.source, ConnectorRole::Source, connectors)?;
    let destination =
        connector_permalink(&recipe.destination, ConnectorRole::Destination, connectors)?;

    let model_instances = recipe
        .model_instances
        .iter()
        .map(|name| {
            let reference = ModelInstanceRef::parse(name)
                .map_err(|_| RegistryError::NotFound(name.clone()))?;
            let location = models.locate(&reference)?;
            Ok(format!(
                "{}/{}/{}/{}",
                MODELS, location.model_uid, INSTANCES, location.uid
            ))
        })
        .collect::<Result<Vec<_>, RegistryError>>()?;

    Ok(Recipe::new(source, model_instances, destination))
}

/// Rewrites permalinks back into resource names
///
/// Entries that are not permalinks of a registered resource are kept as
/// they are, so plain names pass through untouched.
pub fn to_names(
    recipe: &Recipe,
    connectors: &ConnectorRegistry,
    models: &ModelInstanceRegistry,
) -> Recipe {
    let source = connector_name(&recipe.source, ConnectorRole::Source, connectors);
    let destination = connector_name(&recipe.destination, ConnectorRole::Destination, connectors);

    let model_instances = recipe
        .model_instances
        .iter()
        .map(|name| model_name(name, models).unwrap_or_else(|| name.clone()))
        .collect();

    Recipe::new(source, model_instances, destination)
}

fn connector_permalink(
    name: &str,
    role: ConnectorRole,
    connectors: &ConnectorRegistry,
) -> Result<String, RegistryError> {
    let reference =
        ConnectorRef::parse(name, role).map_err(|_| RegistryError::NotFound(name.to_string()))?;
    let info = connectors
        .info(&reference)
        .ok_or_else(|| RegistryError::NotFound(reference.name()))?;
    Ok(format!("{}/{}", role.collection(), info.uid))
}

fn connector_name(permalink: &str, role: ConnectorRole, connectors: &ConnectorRegistry) -> String {
    permalink
        .strip_prefix(role.collection())
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|uid| Uuid::parse_str(uid).ok())
        .and_then(|uid| connectors.id_for_uid(role, uid))
        .map(|id| ConnectorRef::new(role, id).name())
        .unwrap_or_else(|| permalink.to_string())
}

fn model_name(permalink: &str, models: &ModelInstanceRegistry) -> Option<String> {
    let parts: Vec<&str> = permalink.split('/').collect();
    let [MODELS, model_uid, INSTANCES, instance_uid] = parts.as_slice() else {
        return None;
    };

    let model_uid = Uuid::parse_str(model_uid).ok()?;
    let instance_uid = Uuid::parse_str(instance_uid).ok()?;
    let (model_id, tag) = models.lookup_uid(model_uid, instance_uid)?;

    Some(ModelInstanceRef::new(model_id, tag).name())
}
