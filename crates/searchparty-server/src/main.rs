//! Searchparty Server Binary
//!
//! Environment:
//! - `SEARCHPARTY_ADDR`: listen address (default `127.0.0.1:8080`)
//! - `SEARCHPARTY_CONFIG`: TOML or JSON config file
//! - `SEARCHPARTY_DB`: SQLite database path; overrides `store.database_path`
//! - `RUST_LOG`: log filter (default `info`)

use std::sync::Arc;

use searchparty_core::SearchConfig;
use searchparty_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("SEARCHPARTY_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading config from {}", path);
            SearchConfig::load(&path)?
        }
        Err(_) => SearchConfig::default(),
    };

    let db_path = std::env::var("SEARCHPARTY_DB")
        .ok()
        .map(Into::into)
        .or_else(|| config.store.database_path.clone());

    let state = match db_path {
        Some(path) => AppState::with_persistence(config, path)?,
        None => {
            tracing::warn!("No database configured, positions are kept in memory only");
            AppState::in_memory(
                config,
                Arc::new(searchparty_core::InMemoryPartyDirectory::new()),
            )
        }
    };

    let addr = std::env::var("SEARCHPARTY_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    serve(&addr, Arc::new(state)).await?;
    Ok(())
}
