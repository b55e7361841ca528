//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sit between the HTTP handlers and the execution engine.

pub mod recipe;
pub mod run;

// Re-export for convenience
pub use recipe as recipe_service;
pub use run as run_service;
