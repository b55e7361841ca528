//! Core domain types
//!
//! This module contains the core structures used across Sluice services.
//! They are shared between the engine (which produces them), the orchestrator
//! (which serves them) and the client/CLI (which consume them).

pub mod recipe;
pub mod record;
pub mod resource;
pub mod run;
