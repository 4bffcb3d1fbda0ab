//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::ApiKeyRegistry;
use crate::config::Config;

/// Shared application state for the keygate server.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
    /// API key registry; injected so tests can build isolated instances.
    pub registry: Arc<ApiKeyRegistry>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<Config>, registry: Arc<ApiKeyRegistry>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            registry,
        }
    }
}
