//! Application setup and initialization
//!
//! Everything `main` needs before the listener starts: validated configuration,
//! tracing, the media store, and the router.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use vidshelf_core::Config;
use vidshelf_storage::create_storage;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment(), config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let store = create_storage(&config)
        .await
        .context("Failed to initialize media store")?;

    let state = Arc::new(AppState::new(config.clone(), store));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
