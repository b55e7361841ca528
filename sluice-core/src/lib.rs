//! Sluice Core
//!
//! Core types and abstractions for the Sluice recipe execution system.
//!
//! This crate contains:
//! - Domain types: Recipes, resource references, runs and records
//! - DTOs: Data transfer objects for the orchestrator HTTP surface

pub mod domain;
pub mod dto;
