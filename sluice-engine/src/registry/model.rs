//! Model instance registry
//!
//! Maps `models/{model_id}/instances/{instance_tag}` to a live inference
//! handle. An instance is registered under its concrete tag and may carry
//! any number of symbolic aliases (e.g. `latest`).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use sluice_core::domain::resource::{INSTANCES, MODELS, ModelInstanceRef, ResourceState};
use tracing::{debug, info};
use uuid::Uuid;

use super::{RegistryError, read, write};
use crate::capability::ModelInstance;

/// A deployed instance of a model
pub struct InstanceEntry {
    /// Concrete version tag, e.g. `v3`
    pub tag: String,
    pub uid: Uuid,
    pub aliases: BTreeSet<String>,
    pub state: ResourceState,
    pub handle: Arc<dyn ModelInstance>,
}

impl InstanceEntry {
    pub fn new(tag: impl Into<String>, handle: Arc<dyn ModelInstance>) -> Self {
        Self {
            tag: tag.into(),
            uid: Uuid::new_v4(),
            aliases: BTreeSet::new(),
            state: ResourceState::Connected,
            handle,
        }
    }

    pub fn with_uid(mut self, uid: Uuid) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    pub fn with_state(mut self, state: ResourceState) -> Self {
        self.state = state;
        self
    }
}

/// Where a reference points, without requiring the instance to be live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLocation {
    pub model_uid: Uuid,
    /// Concrete tag the reference resolved to
    pub tag: String,
    pub uid: Uuid,
}

/// A live instance bound at build time
#[derive(Clone)]
pub struct ResolvedInstance {
    pub model_id: String,
    pub model_uid: Uuid,
    pub tag: String,
    pub uid: Uuid,
    pub handle: Arc<dyn ModelInstance>,
}

impl ResolvedInstance {
    /// Concrete resource name, e.g. `models/dummy-det/instances/v3`
    pub fn name(&self) -> String {
        ModelInstanceRef::new(&self.model_id, &self.tag).name()
    }

    pub fn permalink(&self) -> String {
        format!("{}/{}/{}/{}", MODELS, self.model_uid, INSTANCES, self.uid)
    }
}

impl std::fmt::Debug for ResolvedInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedInstance")
            .field("model_id", &self.model_id)
            .field("tag", &self.tag)
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

struct ModelRecord {
    uid: Uuid,
    instances: BTreeMap<String, InstanceEntry>,
}

impl ModelRecord {
    /// Finds the concrete tag for `tag`, which may be an alias
    fn resolve_tag(&self, model_id: &str, tag: &str) -> Result<&InstanceEntry, RegistryError> {
        if let Some(entry) = self.instances.get(tag) {
            return Ok(entry);
        }

        let candidates: Vec<&InstanceEntry> = self
            .instances
            .values()
            .filter(|entry| entry.aliases.contains(tag))
            .collect();

        match candidates.as_slice() {
            [entry] => Ok(entry),
            [] => Err(RegistryError::UnresolvedTag {
                model_id: model_id.to_string(),
                tag: tag.to_string(),
            }),
            many => Err(RegistryError::AmbiguousTag {
                model_id: model_id.to_string(),
                tag: tag.to_string(),
                candidates: many.iter().map(|entry| entry.tag.clone()).collect(),
            }),
        }
    }

    fn knows(&self, tag: &str) -> bool {
        self.instances.contains_key(tag)
            || self.instances.values().any(|entry| entry.aliases.contains(tag))
    }
}

/// Registry of models and their deployed instances
pub struct ModelInstanceRegistry {
    models: RwLock<HashMap<String, ModelRecord>>,
}

impl ModelInstanceRegistry {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a model with no instances
    pub fn register_model(&self, model_id: &str, uid: Uuid) -> Result<(), RegistryError> {
        let mut models = write(&self.models);
        if models.contains_key(model_id) {
            return Err(RegistryError::AlreadyRegistered(format!(
                "{}/{}",
                MODELS, model_id
            )));
        }

        info!("Registered {}/{}", MODELS, model_id);
        models.insert(
            model_id.to_string(),
            ModelRecord {
                uid,
                instances: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Registers an instance under an existing model
    pub fn register_instance(
        &self,
        model_id: &str,
        entry: InstanceEntry,
    ) -> Result<(), RegistryError> {
        let mut models = write(&self.models);
        let model = models
            .get_mut(model_id)
            .ok_or_else(|| RegistryError::NotFound(format!("{}/{}", MODELS, model_id)))?;

        let name = ModelInstanceRef::new(model_id, &entry.tag).name();
        if model.instances.contains_key(&entry.tag) {
            return Err(RegistryError::AlreadyRegistered(name));
        }

        info!("Registered {} (aliases: {:?})", name, entry.aliases);
        model.instances.insert(entry.tag.clone(), entry);
        Ok(())
    }

    /// Removes a concrete instance; returns whether it was registered
    pub fn deregister_instance(&self, model_id: &str, tag: &str) -> bool {
        let mut models = write(&self.models);
        let removed = models
            .get_mut(model_id)
            .and_then(|model| model.instances.remove(tag))
            .is_some();

        if removed {
            info!("Deregistered {}", ModelInstanceRef::new(model_id, tag));
        }
        removed
    }

    /// Changes the administrative state of a concrete instance
    pub fn set_state(
        &self,
        model_id: &str,
        tag: &str,
        state: ResourceState,
    ) -> Result<(), RegistryError> {
        let name = ModelInstanceRef::new(model_id, tag).name();
        let mut models = write(&self.models);
        let entry = models
            .get_mut(model_id)
            .and_then(|model| model.instances.get_mut(tag))
            .ok_or(RegistryError::NotFound(name.clone()))?;

        debug!("{} state {:?} -> {:?}", name, entry.state, state);
        entry.state = state;
        Ok(())
    }

    /// Points `alias` at exactly one instance, removing it from all others
    ///
    /// Pipelines built before the call keep the instance they bound.
    pub fn set_alias(&self, model_id: &str, alias: &str, tag: &str) -> Result<(), RegistryError> {
        let mut models = write(&self.models);
        let model = models
            .get_mut(model_id)
            .ok_or_else(|| RegistryError::NotFound(format!("{}/{}", MODELS, model_id)))?;

        if !model.instances.contains_key(tag) {
            return Err(RegistryError::NotFound(
                ModelInstanceRef::new(model_id, tag).name(),
            ));
        }

        for (instance_tag, entry) in model.instances.iter_mut() {
            if instance_tag == tag {
                entry.aliases.insert(alias.to_string());
            } else {
                entry.aliases.remove(alias);
            }
        }

        info!("Alias {}/{}/{} -> {}", MODELS, model_id, alias, tag);
        Ok(())
    }

    /// Adds `alias` to an instance without touching other instances
    pub fn add_alias(&self, model_id: &str, alias: &str, tag: &str) -> Result<(), RegistryError> {
        let name = ModelInstanceRef::new(model_id, tag).name();
        let mut models = write(&self.models);
        let entry = models
            .get_mut(model_id)
            .and_then(|model| model.instances.get_mut(tag))
            .ok_or(RegistryError::NotFound(name))?;

        entry.aliases.insert(alias.to_string());
        Ok(())
    }

    /// Existence check: the model is registered and the tag is known,
    /// either as a concrete tag or as an alias
    pub fn contains(&self, reference: &ModelInstanceRef) -> bool {
        read(&self.models)
            .get(&reference.model_id)
            .is_some_and(|model| model.knows(&reference.instance_tag))
    }

    /// Resolves a reference to its concrete location, ignoring liveness
    pub fn locate(&self, reference: &ModelInstanceRef) -> Result<InstanceLocation, RegistryError> {
        let models = read(&self.models);
        let model = models
            .get(&reference.model_id)
            .ok_or_else(|| RegistryError::NotFound(reference.model_name()))?;

        let entry = model.resolve_tag(&reference.model_id, &reference.instance_tag)?;
        Ok(InstanceLocation {
            model_uid: model.uid,
            tag: entry.tag.clone(),
            uid: entry.uid,
        })
    }

    /// Resolves a reference to a live handle
    ///
    /// Aliases are resolved here, once; the returned handle stays bound to
    /// the concrete instance even if the alias is repointed later.
    pub fn resolve(&self, reference: &ModelInstanceRef) -> Result<ResolvedInstance, RegistryError> {
        let models = read(&self.models);
        let model = models
            .get(&reference.model_id)
            .ok_or_else(|| RegistryError::NotFound(reference.model_name()))?;

        let entry = model.resolve_tag(&reference.model_id, &reference.instance_tag)?;
        if entry.state != ResourceState::Connected {
            return Err(RegistryError::Unavailable(
                ModelInstanceRef::new(&reference.model_id, &entry.tag).name(),
            ));
        }

        Ok(ResolvedInstance {
            model_id: reference.model_id.clone(),
            model_uid: model.uid,
            tag: entry.tag.clone(),
            uid: entry.uid,
            handle: Arc::clone(&entry.handle),
        })
    }

    /// Finds the `(model_id, tag)` registered under a pair of uids
    pub fn lookup_uid(&self, model_uid: Uuid, instance_uid: Uuid) -> Option<(String, String)> {
        read(&self.models)
            .iter()
            .find(|(_, model)| model.uid == model_uid)
            .and_then(|(model_id, model)| {
                model
                    .instances
                    .values()
                    .find(|entry| entry.uid == instance_uid)
                    .map(|entry| (model_id.clone(), entry.tag.clone()))
            })
    }

    pub fn model_uid(&self, model_id: &str) -> Option<Uuid> {
        read(&self.models).get(model_id).map(|model| model.uid)
    }

    /// Lists `(model_id, tag, aliases, state)` for every instance
    pub fn list(&self) -> Vec<(String, String, Vec<String>, ResourceState)> {
        let models = read(&self.models);
        let mut out: Vec<_> = models
            .iter()
            .flat_map(|(model_id, model)| {
                model.instances.values().map(move |entry| {
                    (
                        model_id.clone(),
                        entry.tag.clone(),
                        entry.aliases.iter().cloned().collect(),
                        entry.state,
                    )
                })
            })
            .collect();
        out.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        out
    }
}

impl Default for ModelInstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, StageContext};
    use async_trait::async_trait;
    use sluice_core::domain::record::Record;

    struct Identity;

    #[async_trait]
    impl ModelInstance for Identity {
        async fn infer(
            &self,
            _ctx: &StageContext,
            inputs: Vec<Record>,
        ) -> Result<Vec<Record>, CapabilityError> {
            Ok(inputs)
        }
    }

    fn registry() -> ModelInstanceRegistry {
        let registry = ModelInstanceRegistry::new();
        registry
            .register_model("dummy-det", Uuid::new_v4())
            .unwrap();
        registry
            .register_instance("dummy-det", InstanceEntry::new("v1", Arc::new(Identity)))
            .unwrap();
        registry
            .register_instance(
                "dummy-det",
                InstanceEntry::new("v2", Arc::new(Identity)).with_alias("latest"),
            )
            .unwrap();
        registry
    }

    fn reference(tag: &str) -> ModelInstanceRef {
        ModelInstanceRef::new("dummy-det", tag)
    }

    #[test]
    fn test_resolve_concrete_and_alias() {
        let registry = registry();

        assert_eq!(registry.resolve(&reference("v1")).unwrap().tag, "v1");
        assert_eq!(registry.resolve(&reference("latest")).unwrap().tag, "v2");
        assert_eq!(
            registry.resolve(&reference("latest")).unwrap().name(),
            "models/dummy-det/instances/v2"
        );
    }

    #[test]
    fn test_contains_is_existence_only() {
        let registry = registry();
        registry
            .set_state("dummy-det", "v2", ResourceState::Disconnected)
            .unwrap();

        assert!(registry.contains(&reference("latest")));
        assert!(!registry.contains(&reference("nightly")));
        assert!(!registry.contains(&ModelInstanceRef::new("other", "v1")));
        assert!(matches!(
            registry.resolve(&reference("latest")),
            Err(RegistryError::Unavailable(name)) if name == "models/dummy-det/instances/v2"
        ));
    }

    #[test]
    fn test_set_alias_moves_alias() {
        let registry = registry();
        registry.set_alias("dummy-det", "latest", "v1").unwrap();

        assert_eq!(registry.locate(&reference("latest")).unwrap().tag, "v1");
        assert!(registry.set_alias("dummy-det", "latest", "v9").is_err());
    }

    #[test]
    fn test_ambiguous_alias() {
        let registry = registry();
        registry.add_alias("dummy-det", "latest", "v1").unwrap();

        match registry.resolve(&reference("latest")) {
            Err(RegistryError::AmbiguousTag { candidates, .. }) => {
                assert_eq!(candidates, vec!["v1".to_string(), "v2".to_string()]);
            }
            other => panic!("expected ambiguous tag, got {:?}", other.map(|r| r.tag)),
        }
    }

    #[test]
    fn test_unresolved_tag() {
        let registry = registry();
        assert!(matches!(
            registry.locate(&reference("stable")),
            Err(RegistryError::UnresolvedTag { .. })
        ));
        assert!(matches!(
            registry.locate(&ModelInstanceRef::new("missing", "v1")),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_uid_lookup() {
        let registry = registry();
        let location = registry.locate(&reference("latest")).unwrap();

        assert_eq!(
            registry.lookup_uid(location.model_uid, location.uid),
            Some(("dummy-det".to_string(), "v2".to_string()))
        );
        assert_eq!(registry.lookup_uid(location.model_uid, Uuid::new_v4()), None);
    }

    #[test]
    fn test_deregister_instance() {
        let registry = registry();
        assert!(registry.deregister_instance("dummy-det", "v2"));
        assert!(!registry.contains(&reference("latest")));
        assert_eq!(registry.list().len(), 1);
    }
}
