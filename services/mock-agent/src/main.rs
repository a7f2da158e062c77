//! Mock compute node agent
//!
//! Emulates a fleet of compute nodes on one host. Every directory under the
//! mock CN root is one emulated node with its own background agent, and an
//! HTTP API lets clients create node inventories with sensible defaults.
//!
//! ## Architecture
//!
//! - **Registry**: Watches the mock CN root and keeps one agent per entry
//! - **Control API**: Validates and completes inventory records
//! - **State store**: Persists per-node indexes used for MAC addresses

use std::sync::Arc;

use anyhow::{Context, Result};
use mockcn_agent::{
    agent::UrAgentFactory,
    api,
    config::Config,
    context::AppState,
    defaults::DefaultsEngine,
    inventory::{InventoryValidator, ValidationMode},
    metadata::CommandMetadata,
    profiles::CannedProfiles,
    registry::{self, NodeInstanceRegistry},
    state::StateStore,
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to MOCKCN_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting mock CN agent");
    info!(
        listen_addr = %config.listen_addr,
        mockcn_dir = %config.mockcn_dir.display(),
        state_file = %config.state_file.display(),
        "Configuration loaded"
    );

    let profiles = match &config.profiles_file {
        Some(path) => CannedProfiles::load(path).await?,
        None => CannedProfiles::embedded()?,
    };
    info!(profiles = ?profiles.names().collect::<Vec<_>>(), "Canned profiles ready");

    tokio::fs::create_dir_all(&config.mockcn_dir)
        .await
        .with_context(|| format!("failed to create {}", config.mockcn_dir.display()))?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the instance registry
    let (_watcher, trigger_rx) = match registry::spawn_watcher(&config.mockcn_dir) {
        Ok((watcher, rx)) => (Some(watcher), rx),
        Err(e) => {
            warn!(error = %e, "Directory watch unavailable, relying on periodic resync");
            let (_, rx) = mpsc::channel(1);
            (None, rx)
        }
    };
    let registry = NodeInstanceRegistry::from_config(
        &config,
        UrAgentFactory::new(config.heartbeat_interval),
    );
    let registry_handle = tokio::spawn(registry.run(
        trigger_rx,
        config.resync_interval,
        shutdown_rx.clone(),
    ));

    // Create application state
    let store = Arc::new(StateStore::new(config.state_file.clone()));
    let mode = if config.strict_validation {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };
    let defaults = DefaultsEngine::new(
        Arc::new(CommandMetadata::from_config(&config)),
        Arc::clone(&store),
        profiles,
    );
    let state = AppState::new(store, InventoryValidator::new(mode), defaults);

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server_handle = tokio::spawn({
        let mut shutdown_rx = shutdown_rx.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    loop {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        if shutdown_rx.changed().await.is_err() {
                            break;
                        }
                    }
                    info!("HTTP server shutting down");
                })
                .await
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    // Signal shutdown to all workers
    let _ = shutdown_tx.send(true);

    info!("Waiting for workers to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);
    if let Err(e) = tokio::time::timeout(shutdown_timeout, registry_handle).await {
        warn!(error = %e, "Instance registry did not shut down in time");
    }

    info!("Mock CN agent shutdown complete");
    Ok(())
}
