//! Resource references
//!
//! Recipes reference connectors and model instances by resource name:
//! - `source-connectors/{id}`
//! - `destination-connectors/{id}`
//! - `models/{model_id}/instances/{instance_tag}`
//!
//! The same shapes are used for permalinks, where each id is replaced by the
//! registry uid of the resource.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SOURCE_CONNECTORS: &str = "source-connectors";
pub const DESTINATION_CONNECTORS: &str = "destination-connectors";
pub const MODELS: &str = "models";
pub const INSTANCES: &str = "instances";

/// Errors produced while parsing a resource name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefError {
    #[error("resource name is empty")]
    Empty,

    #[error("'{name}' is not in the '{expected}' collection")]
    WrongCollection { name: String, expected: &'static str },

    #[error("'{0}' is not a well-formed resource name")]
    Malformed(String),

    #[error("'{id}' in '{name}' contains invalid characters")]
    InvalidId { name: String, id: String },
}

/// Role of a connector inside a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorRole {
    Source,
    Destination,
}

impl ConnectorRole {
    /// Collection id used in resource names for this role
    pub fn collection(self) -> &'static str {
        match self {
            ConnectorRole::Source => SOURCE_CONNECTORS,
            ConnectorRole::Destination => DESTINATION_CONNECTORS,
        }
    }
}

impl std::fmt::Display for ConnectorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorRole::Source => write!(f, "source"),
            ConnectorRole::Destination => write!(f, "destination"),
        }
    }
}

/// How a connector exchanges data with the outside world
///
/// Directness connectors carry data inline with the trigger request and its
/// response (e.g. `source-http` / `destination-http`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Directness,
    #[default]
    Api,
    File,
}

/// Administrative state of a registered connector or model instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    #[default]
    Connected,
    Disconnected,
}

/// Reference to a connector: `{collection}/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorRef {
    pub role: ConnectorRole,
    pub id: String,
}

impl ConnectorRef {
    pub fn new(role: ConnectorRole, id: impl Into<String>) -> Self {
        Self {
            role,
            id: id.into(),
        }
    }

    /// Parse a resource name, requiring the collection of `role`
    pub fn parse(name: &str, role: ConnectorRole) -> Result<Self, RefError> {
        if name.is_empty() {
            return Err(RefError::Empty);
        }

        let (collection, id) = name
            .split_once('/')
            .ok_or_else(|| RefError::Malformed(name.to_string()))?;

        if collection != role.collection() {
            return Err(RefError::WrongCollection {
                name: name.to_string(),
                expected: role.collection(),
            });
        }

        check_id(name, id)?;

        Ok(Self::new(role, id))
    }

    /// Resource name, e.g. `source-connectors/source-http`
    pub fn name(&self) -> String {
        format!("{}/{}", self.role.collection(), self.id)
    }
}

impl std::fmt::Display for ConnectorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.role.collection(), self.id)
    }
}

/// Reference to a model instance: `models/{model_id}/instances/{instance_tag}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelInstanceRef {
    pub model_id: String,
    pub instance_tag: String,
}

impl ModelInstanceRef {
    pub fn new(model_id: impl Into<String>, instance_tag: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            instance_tag: instance_tag.into(),
        }
    }

    pub fn parse(name: &str) -> Result<Self, RefError> {
        if name.is_empty() {
            return Err(RefError::Empty);
        }

        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            [MODELS, model_id, INSTANCES, tag] => {
                check_id(name, model_id)?;
                check_id(name, tag)?;
                Ok(Self::new(*model_id, *tag))
            }
            [first, ..] if *first != MODELS => Err(RefError::WrongCollection {
                name: name.to_string(),
                expected: MODELS,
            }),
            _ => Err(RefError::Malformed(name.to_string())),
        }
    }

    /// Name of the owning model, e.g. `models/dummy-det`
    pub fn model_name(&self) -> String {
        format!("{}/{}", MODELS, self.model_id)
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ModelInstanceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            MODELS, self.model_id, INSTANCES, self.instance_tag
        )
    }
}

fn check_id(name: &str, id: &str) -> Result<(), RefError> {
    if id.is_empty() {
        return Err(RefError::Malformed(name.to_string()));
    }

    let valid = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !valid {
        return Err(RefError::InvalidId {
            name: name.to_string(),
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connector_ref() {
        let r = ConnectorRef::parse("source-connectors/source-http", ConnectorRole::Source).unwrap();
        assert_eq!(r.id, "source-http");
        assert_eq!(r.name(), "source-connectors/source-http");
    }

    #[test]
    fn test_connector_ref_wrong_collection() {
        let err = ConnectorRef::parse(
            "destination-connectors/destination-http",
            ConnectorRole::Source,
        )
        .unwrap_err();
        assert!(matches!(err, RefError::WrongCollection { expected, .. } if expected == SOURCE_CONNECTORS));
    }

    #[test]
    fn test_connector_ref_malformed() {
        assert_eq!(
            ConnectorRef::parse("source-http", ConnectorRole::Source),
            Err(RefError::Malformed("source-http".to_string()))
        );
        assert_eq!(ConnectorRef::parse("", ConnectorRole::Source), Err(RefError::Empty));
        assert!(matches!(
            ConnectorRef::parse("source-connectors/a/b", ConnectorRole::Source),
            Err(RefError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_parse_model_instance_ref() {
        let r = ModelInstanceRef::parse("models/dummy-det/instances/latest").unwrap();
        assert_eq!(r.model_id, "dummy-det");
        assert_eq!(r.instance_tag, "latest");
        assert_eq!(r.model_name(), "models/dummy-det");
        assert_eq!(r.to_string(), "models/dummy-det/instances/latest");
    }

    #[test]
    fn test_model_instance_ref_errors() {
        assert!(matches!(
            ModelInstanceRef::parse("pipelines/x/instances/y"),
            Err(RefError::WrongCollection { .. })
        ));
        assert!(matches!(
            ModelInstanceRef::parse("models/dummy-det"),
            Err(RefError::Malformed(_))
        ));
        assert!(matches!(
            ModelInstanceRef::parse("models/dummy-det/versions/latest"),
            Err(RefError::Malformed(_))
        ));
        assert!(matches!(
            ModelInstanceRef::parse("models/dummy det/instances/latest"),
            Err(RefError::InvalidId { .. })
        ));
    }
}
