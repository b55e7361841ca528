//! Connector registry
//!
//! Holds source and destination connectors in two role-namespaced tables,
//! keyed by connector id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use sluice_core::domain::resource::{ConnectionType, ConnectorRef, ConnectorRole, ResourceState};
use tracing::{debug, info};
use uuid::Uuid;

use super::{RegistryError, read, write};
use crate::capability::{DestinationConnector, SourceConnector};

/// A registered connector and its live handle
pub struct ConnectorEntry<T: ?Sized> {
    pub id: String,
    /// Stable identifier used in permalinks
    pub uid: Uuid,
    /// Connector definition, e.g. `source-http`
    pub definition: String,
    pub connection_type: ConnectionType,
    pub state: ResourceState,
    pub handle: Arc<T>,
}

pub type SourceEntry = ConnectorEntry<dyn SourceConnector>;
pub type DestinationEntry = ConnectorEntry<dyn DestinationConnector>;

impl<T: ?Sized> ConnectorEntry<T> {
    /// Creates a connected entry with a fresh uid
    pub fn new(
        id: impl Into<String>,
        definition: impl Into<String>,
        connection_type: ConnectionType,
        handle: Arc<T>,
    ) -> Self {
        Self {
            id: id.into(),
            uid: Uuid::new_v4(),
            definition: definition.into(),
            connection_type,
            state: ResourceState::Connected,
            handle,
        }
    }

    pub fn with_uid(mut self, uid: Uuid) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_state(mut self, state: ResourceState) -> Self {
        self.state = state;
        self
    }

    fn info(&self, role: ConnectorRole) -> ConnectorInfo {
        ConnectorInfo {
            role,
            id: self.id.clone(),
            uid: self.uid,
            definition: self.definition.clone(),
            connection_type: self.connection_type,
            state: self.state,
        }
    }
}

impl<T: ?Sized> Clone for ConnectorEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            uid: self.uid,
            definition: self.definition.clone(),
            connection_type: self.connection_type,
            state: self.state,
            handle: Arc::clone(&self.handle),
        }
    }
}

/// Connector metadata without the handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorInfo {
    pub role: ConnectorRole,
    pub id: String,
    pub uid: Uuid,
    pub definition: String,
    pub connection_type: ConnectionType,
    pub state: ResourceState,
}

struct Table<T: ?Sized> {
    role: ConnectorRole,
    entries: RwLock<HashMap<String, ConnectorEntry<T>>>,
}

impl<T: ?Sized> Table<T> {
    fn new(role: ConnectorRole) -> Self {
        Self {
            role,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn name(&self, id: &str) -> String {
        ConnectorRef::new(self.role, id).name()
    }

    fn register(&self, entry: ConnectorEntry<T>) -> Result<(), RegistryError> {
        let mut entries = write(&self.entries);
        if entries.contains_key(&entry.id) {
            return Err(RegistryError::AlreadyRegistered(self.name(&entry.id)));
        }
        info!("Registered {} ({})", self.name(&entry.id), entry.definition);
        entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    fn deregister(&self, id: &str) -> bool {
        let removed = write(&self.entries).remove(id).is_some();
        if removed {
            info!("Deregistered {}", self.name(id));
        }
        removed
    }

    fn set_state(&self, id: &str, state: ResourceState) -> Result<(), RegistryError> {
        let mut entries = write(&self.entries);
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(self.name(id)))?;
        debug!("{} state {:?} -> {:?}", self.name(id), entry.state, state);
        entry.state = state;
        Ok(())
    }

    fn contains(&self, id: &str) -> bool {
        read(&self.entries).contains_key(id)
    }

    fn info(&self, id: &str) -> Option<ConnectorInfo> {
        read(&self.entries).get(id).map(|e| e.info(self.role))
    }

    fn resolve(&self, id: &str) -> Result<ConnectorEntry<T>, RegistryError> {
        let entries = read(&self.entries);
        let entry = entries
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(self.name(id)))?;

        if entry.state != ResourceState::Connected {
            return Err(RegistryError::Unavailable(self.name(id)));
        }

        Ok(entry.clone())
    }

    fn id_for_uid(&self, uid: Uuid) -> Option<String> {
        read(&self.entries)
            .values()
            .find(|e| e.uid == uid)
            .map(|e| e.id.clone())
    }

    fn list(&self) -> Vec<ConnectorInfo> {
        let mut infos: Vec<ConnectorInfo> = read(&self.entries)
            .values()
            .map(|e| e.info(self.role))
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}

/// Registry of source and destination connectors
pub struct ConnectorRegistry {
    sources: Table<dyn SourceConnector>,
    destinations: Table<dyn DestinationConnector>,
}

impl ConnectorRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            sources: Table::new(ConnectorRole::Source),
            destinations: Table::new(ConnectorRole::Destination),
        }
    }

    pub fn register_source(&self, entry: SourceEntry) -> Result<(), RegistryError> {
        self.sources.register(entry)
    }

    pub fn register_destination(&self, entry: DestinationEntry) -> Result<(), RegistryError> {
        self.destinations.register(entry)
    }

    /// Removes a connector; returns whether it was registered
    pub fn deregister(&self, reference: &ConnectorRef) -> bool {
        match reference.role {
            ConnectorRole::Source => self.sources.deregister(&reference.id),
            ConnectorRole::Destination => self.destinations.deregister(&reference.id),
        }
    }

    pub fn set_state(
        &self,
        reference: &ConnectorRef,
        state: ResourceState,
    ) -> Result<(), RegistryError> {
        match reference.role {
            ConnectorRole::Source => self.sources.set_state(&reference.id, state),
            ConnectorRole::Destination => self.destinations.set_state(&reference.id, state),
        }
    }

    /// Existence check, regardless of availability
    pub fn contains(&self, reference: &ConnectorRef) -> bool {
        match reference.role {
            ConnectorRole::Source => self.sources.contains(&reference.id),
            ConnectorRole::Destination => self.destinations.contains(&reference.id),
        }
    }

    pub fn info(&self, reference: &ConnectorRef) -> Option<ConnectorInfo> {
        match reference.role {
            ConnectorRole::Source => self.sources.info(&reference.id),
            ConnectorRole::Destination => self.destinations.info(&reference.id),
        }
    }

    /// Resolves a live source handle
    pub fn resolve_source(&self, reference: &ConnectorRef) -> Result<SourceEntry, RegistryError> {
        match reference.role {
            ConnectorRole::Source => self.sources.resolve(&reference.id),
            ConnectorRole::Destination => Err(RegistryError::NotFound(reference.name())),
        }
    }

    /// Resolves a live destination handle
    pub fn resolve_destination(
        &self,
        reference: &ConnectorRef,
    ) -> Result<DestinationEntry, RegistryError> {
        match reference.role {
            ConnectorRole::Destination => self.destinations.resolve(&reference.id),
            ConnectorRole::Source => Err(RegistryError::NotFound(reference.name())),
        }
    }

    /// Finds the connector id registered under `uid`
    pub fn id_for_uid(&self, role: ConnectorRole, uid: Uuid) -> Option<String> {
        match role {
            ConnectorRole::Source => self.sources.id_for_uid(uid),
            ConnectorRole::Destination => self.destinations.id_for_uid(uid),
        }
    }

    /// Lists all connectors, sources first
    pub fn list(&self) -> Vec<ConnectorInfo> {
        let mut infos = self.sources.list();
        infos.extend(self.destinations.list());
        infos
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Ack, CapabilityError, StageContext};
    use async_trait::async_trait;
    use sluice_core::domain::record::Record;

    struct NullSource;

    #[async_trait]
    impl SourceConnector for NullSource {
        async fn fetch(
            &self,
            _ctx: &StageContext,
            inputs: &[Record],
        ) -> Result<Vec<Record>, CapabilityError> {
            Ok(inputs.to_vec())
        }
    }

    struct NullDestination;

    #[async_trait]
    impl DestinationConnector for NullDestination {
        async fn commit(
            &self,
            _ctx: &StageContext,
            records: Vec<Record>,
        ) -> Result<Ack, CapabilityError> {
            Ok(Ack::new(records.len()))
        }
    }

    fn registry() -> ConnectorRegistry {
        let registry = ConnectorRegistry::new();
        registry
            .register_source(SourceEntry::new(
                "source-http",
                "source-http",
                ConnectionType::Directness,
                Arc::new(NullSource),
            ))
            .unwrap();
        registry
            .register_destination(DestinationEntry::new(
                "destination-http",
                "destination-http",
                ConnectionType::Directness,
                Arc::new(NullDestination),
            ))
            .unwrap();
        registry
    }

    #[test]
    fn test_resolve_registered_connectors() {
        let registry = registry();
        let src = ConnectorRef::new(ConnectorRole::Source, "source-http");
        let dst = ConnectorRef::new(ConnectorRole::Destination, "destination-http");

        assert!(registry.contains(&src));
        assert!(registry.resolve_source(&src).is_ok());
        assert!(registry.resolve_destination(&dst).is_ok());
    }

    #[test]
    fn test_roles_are_namespaced() {
        let registry = registry();
        let wrong = ConnectorRef::new(ConnectorRole::Destination, "source-http");

        assert!(!registry.contains(&wrong));
        assert_eq!(
            registry.resolve_destination(&wrong).err(),
            Some(RegistryError::NotFound(
                "destination-connectors/source-http".to_string()
            ))
        );
    }

    #[test]
    fn test_unavailable_connector() {
        let registry = registry();
        let src = ConnectorRef::new(ConnectorRole::Source, "source-http");

        registry
            .set_state(&src, ResourceState::Disconnected)
            .unwrap();

        // Still exists, but cannot be resolved to a live handle
        assert!(registry.contains(&src));
        assert!(matches!(
            registry.resolve_source(&src),
            Err(RegistryError::Unavailable(_))
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = registry();
        let err = registry
            .register_source(SourceEntry::new(
                "source-http",
                "source-http",
                ConnectionType::Directness,
                Arc::new(NullSource),
            ))
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
    }

    #[test]
    fn test_uid_lookup_and_deregister() {
        let registry = registry();
        let src = ConnectorRef::new(ConnectorRole::Source, "source-http");
        let uid = registry.info(&src).unwrap().uid;

        assert_eq!(
            registry.id_for_uid(ConnectorRole::Source, uid).as_deref(),
            Some("source-http")
        );
        assert_eq!(registry.id_for_uid(ConnectorRole::Destination, uid), None);

        assert!(registry.deregister(&src));
        assert!(!registry.deregister(&src));
        assert_eq!(registry.list().len(), 1);
    }
}
