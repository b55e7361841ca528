//! Data Transfer Objects for the orchestrator HTTP surface
//!
//! This module contains DTOs exchanged between the orchestrator and its
//! clients (the client crate and the CLI).

pub mod error;
pub mod recipe;
pub mod run;
