//! Execution-mode inference
//!
//! When a submission does not pick a mode, it follows from the connectors:
//! a pair of directness connectors of the same family (`source-http` and
//! `destination-http`) runs synchronously, any other pair asynchronously.

use sluice_core::domain::recipe::ExecutionMode;
use sluice_core::domain::resource::ConnectionType;

use crate::registry::{ConnectorInfo, ConnectorRegistry};
use crate::validator::{ValidatedRecipe, ValidationError, ValidationErrorKind};

/// Infers the mode from a source/destination pair
pub fn infer_mode(
    source: &ConnectorInfo,
    destination: &ConnectorInfo,
) -> Result<ExecutionMode, ValidationError> {
    let both_direct = source.connection_type == ConnectionType::Directness
        && destination.connection_type == ConnectionType::Directness;

    if !both_direct {
        return Ok(ExecutionMode::Async);
    }

    match (family(&source.definition), family(&destination.definition)) {
        (Some(src), Some(dst)) if src == dst => Ok(ExecutionMode::Sync),
        _ => Err(ValidationError::new(
            "recipe",
            ValidationErrorKind::Mode,
            format!(
                "directness connectors must share a definition family, got '{}' and '{}'",
                source.definition, destination.definition
            ),
        )),
    }
}

/// Returns the requested mode, or infers one for a validated recipe
pub fn resolve_mode(
    requested: Option<ExecutionMode>,
    connectors: &ConnectorRegistry,
    validated: &ValidatedRecipe,
) -> Result<ExecutionMode, ValidationError> {
    if let Some(mode) = requested {
        return Ok(mode);
    }

    let source = connectors.info(validated.source()).ok_or_else(|| {
        ValidationError::new(
            "source",
            ValidationErrorKind::NotFound,
            format!("{} is not registered", validated.source()),
        )
    })?;
    let destination = connectors.info(validated.destination()).ok_or_else(|| {
        ValidationError::new(
            "destination",
            ValidationErrorKind::NotFound,
            format!("{} is not registered", validated.destination()),
        )
    })?;

    infer_mode(&source, &destination)
}

/// `source-http` -> `http`
fn family(definition: &str) -> Option<&str> {
    definition
        .split_once('-')
        .map(|(_, family)| family)
        .filter(|family| !family.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::domain::resource::{ConnectorRole, ResourceState};
    use uuid::Uuid;

    fn info(role: ConnectorRole, definition: &str, connection_type: ConnectionType) -> ConnectorInfo {
        ConnectorInfo {
            role,
            id: definition.to_string(),
            uid: Uuid::new_v4(),
            definition: definition.to_string(),
            connection_type,
            state: ResourceState::Connected,
        }
    }

    #[test]
    fn test_matching_directness_is_sync() {
        let src = info(ConnectorRole::Source, "source-http", ConnectionType::Directness);
        let dst = info(
            ConnectorRole::Destination,
            "destination-http",
            ConnectionType::Directness,
        );
        assert_eq!(infer_mode(&src, &dst), Ok(ExecutionMode::Sync));
    }

    #[test]
    fn test_mismatched_directness_is_rejected() {
        let src = info(ConnectorRole::Source, "source-http", ConnectionType::Directness);
        let dst = info(
            ConnectorRole::Destination,
            "destination-grpc",
            ConnectionType::Directness,
        );
        let err = infer_mode(&src, &dst).unwrap_err();
        assert_eq!(err.field, "recipe");
        assert_eq!(err.kind, ValidationErrorKind::Mode);
    }

    #[test]
    fn test_other_connection_types_are_async() {
        let src = info(ConnectorRole::Source, "source-http", ConnectionType::Directness);
        let dst = info(
            ConnectorRole::Destination,
            "destination-csv",
            ConnectionType::File,
        );
        assert_eq!(infer_mode(&src, &dst), Ok(ExecutionMode::Async));
    }

    #[test]
    fn test_family() {
        assert_eq!(family("source-http"), Some("http"));
        assert_eq!(family("destination-object-store"), Some("object-store"));
        assert_eq!(family("http"), None);
        assert_eq!(family("source-"), None);
    }
}
