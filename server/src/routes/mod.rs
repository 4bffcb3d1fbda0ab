//! HTTP route handlers and router assembly.
//!
//! Three route groups with three gates:
//!
//! - `/api/health` — public, no authentication
//! - `/graphql`, `/api/whoami` — generic gate
//!   ([`crate::auth::middleware::require_signature`])
//! - `/admin/keys*` — admin gate
//!   ([`crate::auth::middleware::require_admin_signature`])

pub mod admin;
pub mod graphql;
pub mod health;

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::auth::middleware::{require_admin_signature, require_signature};
use crate::state::AppState;

/// Build the full application router. Extracted from `main` so tests can
/// drive the real route/middleware stack with `tower::ServiceExt::oneshot`.
pub fn router(state: AppState) -> Router {
    let public = Router::new().route("/api/health", get(health::health));

    let app_routes = Router::new()
        .route("/graphql", post(graphql::graphql))
        .route("/api/whoami", get(graphql::whoami))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_signature,
        ));

    let admin_routes = Router::new()
        .route("/admin/keys", get(admin::list_keys).post(admin::add_key))
        .route("/admin/keys/{key}/enable", post(admin::enable_key))
        .route("/admin/keys/{key}/disable", post(admin::disable_key))
        .route("/admin/keys/{key}", axum::routing::delete(admin::remove_key))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_signature,
        ));

    Router::new()
        .merge(public)
        .merge(app_routes)
        .merge(admin_routes)
        .with_state(state)
}
