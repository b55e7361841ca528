//! Orchestrator configuration

use std::path::PathBuf;

use anyhow::Result;
use sluice_engine::EngineConfig;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// JSON catalog of connectors and model instances
    pub catalog_path: PathBuf,

    pub engine: EngineConfig,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// - ORCHESTRATOR_BIND_ADDR (default: 0.0.0.0:8080)
    /// - CATALOG_PATH (default: catalog.json)
    /// - engine variables, see [`EngineConfig::from_env`]
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("ORCHESTRATOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let catalog_path = std::env::var("CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("catalog.json"));

        let engine = EngineConfig::from_env()?;
        engine.validate()?;

        Ok(Self {
            bind_addr,
            catalog_path,
            engine,
        })
    }
}
