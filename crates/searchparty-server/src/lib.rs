//! Searchparty Server - Party presence and heatmap API
//!
//! HTTP surface over searchparty-core. Each participant records its own
//! position; reads return the caller's presence view and heatmap overlay.

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use searchparty_core::{
    Clock, ConfigError, InMemoryLocationStore, InMemoryPartyDirectory, LocationStore,
    PartyDirectory, SearchConfig, SearchError, SystemClock, Timestamp,
};

/// Errors that stop the server from starting
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] SearchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn LocationStore>,
    pub directory: Arc<dyn PartyDirectory>,
    pub config: SearchConfig,
    pub clock: Arc<dyn Clock>,
    pub started_at: Timestamp,
}

impl AppState {
    /// In-memory store and directory with default configuration
    pub fn new() -> Self {
        Self::in_memory(SearchConfig::default(), Arc::new(InMemoryPartyDirectory::new()))
    }

    /// In-memory store with the given config and party directory
    pub fn in_memory(config: SearchConfig, directory: Arc<dyn PartyDirectory>) -> Self {
        Self {
            store: Arc::new(InMemoryLocationStore::new()),
            directory,
            config,
            clock: Arc::new(SystemClock),
            started_at: Timestamp::now(),
        }
    }

    /// SQLite-backed store; the same database serves as party directory
    #[cfg(feature = "sqlite")]
    pub fn with_persistence(
        config: SearchConfig,
        db_path: impl AsRef<std::path::Path>,
    ) -> Result<Self, ServerError> {
        let store = Arc::new(searchparty_core::SqliteLocationStore::new(&db_path)?);
        tracing::info!("Opened location database at {:?}", db_path.as_ref());

        Ok(Self {
            store: store.clone(),
            directory: store,
            config,
            clock: Arc::new(SystemClock),
            started_at: Timestamp::now(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Party endpoints
        .route("/parties/{party_id}/presence", get(http::get_presence))
        .route("/parties/{party_id}/heatmap", get(http::get_heatmap))
        .route("/parties/{party_id}/position", put(http::put_position))
        .route("/parties/{party_id}/area", get(http::get_search_area))
        // System endpoints
        .route("/status", get(http::get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), ServerError> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Searchparty server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
