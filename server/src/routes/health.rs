//! Unauthenticated health-check endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /api/health` — liveness check.
///
/// Returns status, uptime, version, and the number of registered keys. No
/// authentication required, suitable for load-balancer health checks.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "registered_keys": state.registry.len(),
        "environment": state.config.auth.environment.as_deref().unwrap_or("development"),
    }))
}
