use std::sync::Arc;

use sluice_engine::{ConnectorRegistry, Engine, ModelInstanceRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod catalog;
pub mod config;
pub mod connectors;
pub mod models;
pub mod service;

use catalog::Catalog;
use config::Config;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sluice_orchestrator=debug,sluice_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sluice Orchestrator...");

    let config = Config::from_env().expect("Invalid configuration");

    tracing::info!(
        "Stage timeout {:?}, retention {:?} / {} runs, {} concurrent run(s)",
        config.engine.stage_timeout,
        config.engine.retention_window,
        config.engine.retention_max_runs,
        config.engine.max_concurrent_runs
    );

    // Load the catalog into fresh registries
    let connectors = Arc::new(ConnectorRegistry::new());
    let models = Arc::new(ModelInstanceRegistry::new());

    let catalog = if config.catalog_path.exists() {
        Catalog::load(&config.catalog_path).expect("Failed to load catalog")
    } else {
        tracing::warn!(
            "Catalog {} not found, starting with empty registries",
            config.catalog_path.display()
        );
        Catalog::default()
    };

    let loaded = catalog
        .register(&connectors, &models)
        .expect("Failed to register catalog");

    tracing::info!(
        "Registered {} source(s), {} destination(s), {} model instance(s)",
        loaded.sources,
        loaded.destinations,
        loaded.instances
    );

    let engine = Arc::new(Engine::new(config.engine.clone(), connectors, models));
    let _sweeper = engine.spawn_sweeper();

    // Build router with all API endpoints
    let app = api::create_router(engine);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
