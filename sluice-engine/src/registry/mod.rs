//! Registries
//!
//! Registries map reference strings to live capability handles. They are
//! read-mostly: lookups take a shared lock, while registration and state
//! changes (the administrative side channel) take an exclusive one. Locks are
//! only held for the duration of a map operation, never across a capability
//! call.

pub mod connector;
pub mod model;

pub use connector::{
    ConnectorEntry, ConnectorInfo, ConnectorRegistry, DestinationEntry, SourceEntry,
};
pub use model::{InstanceEntry, InstanceLocation, ModelInstanceRegistry, ResolvedInstance};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Registry lookup and administration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0} is not registered")]
    NotFound(String),

    #[error("{0} is registered but currently unavailable")]
    Unavailable(String),

    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    #[error("instance tag '{tag}' of model '{model_id}' does not resolve to any version")]
    UnresolvedTag { model_id: String, tag: String },

    #[error(
        "instance tag '{tag}' of model '{model_id}' resolves to multiple versions: {}",
        candidates.join(", ")
    )]
    AmbiguousTag {
        model_id: String,
        tag: String,
        candidates: Vec<String>,
    },
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
