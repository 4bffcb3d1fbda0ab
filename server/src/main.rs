#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # keygate
//!
//! HMAC-signed API gateway for the merchant app server. Every request to the
//! app surface carries an `Authorization` header with an API key, timestamp,
//! nonce, and an HMAC-SHA256 signature over a canonical serialization of the
//! request; the gate verifies it before the inner handlers run.
//!
//! ## API surface
//!
//! | Method | Path                        | Auth        | Description                    |
//! |--------|-----------------------------|-------------|--------------------------------|
//! | GET    | `/api/health`               | No          | Liveness check                 |
//! | POST   | `/graphql`                  | HMAC-SHA256 | App endpoint                   |
//! | GET    | `/api/whoami`               | HMAC-SHA256 | Authenticated identity         |
//! | GET    | `/admin/keys`               | Admin       | List keys (secrets redacted)   |
//! | POST   | `/admin/keys`               | Admin       | Register a key                 |
//! | POST   | `/admin/keys/{key}/enable`  | Admin       | Enable a key                   |
//! | POST   | `/admin/keys/{key}/disable` | Admin       | Disable a key                  |
//! | DELETE | `/admin/keys/{key}`         | Admin       | Remove a key                   |
//!
//! ## Architecture
//!
//! ```text
//! main.rs            — entry point, clap subcommands, router setup, graceful shutdown
//! config.rs          — TOML + env-var configuration
//! state.rs           — shared AppState (config, registry, start time)
//! auth/
//!   canonical.rs     — nonce, timestamp window, query/body canonicalization, string to sign
//!   signature.rs     — HMAC-SHA256 engine, constant-time verification
//!   header.rs        — the two Authorization header formats
//!   registry.rs      — in-memory API key registry + bootstrap
//!   middleware.rs    — request gates (generic + admin)
//!   error.rs         — failure taxonomy, JSON error envelope
//! routes/
//!   health.rs        — GET /api/health
//!   graphql.rs       — POST /graphql, GET /api/whoami
//!   admin.rs         — /admin/keys management
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use keygate::auth::ApiKeyRegistry;
use keygate::{routes, AppState, Config};

/// HMAC-signed API gateway for the merchant app server.
#[derive(Parser)]
#[command(name = "keygate", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default when no subcommand given).
    Serve {
        /// Path to TOML config file.
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = match cli.command {
        Some(Commands::Serve { config }) => config,
        None => None,
    };
    run_server(config_path.as_deref()).await;
}

async fn run_server(config_path: Option<&str>) {
    let config = Config::load(config_path);

    // Initialize tracing
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    info!("keygate v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}", config.server.listen);

    if config.auth.environment.is_none() {
        warn!(
            "auth.environment is not set; classifying this process as development, \
             which enables the dev bypass by default — set KEYGATE_ENV=production \
             for production deployments"
        );
    }
    if config.auth.bypass_active() {
        warn!("development bypass is ACTIVE: header-less requests are admitted as '{}'",
            keygate::auth::DEV_BYPASS_IDENTITY);
    }
    if !config.auth.required {
        warn!("authentication is OPTIONAL: unsigned requests pass through without identity");
    }

    let registry = Arc::new(ApiKeyRegistry::new());
    registry.bootstrap(&config.auth);
    if registry.is_empty() && !config.auth.bypass_active() {
        warn!("no API keys registered; every signed request will be rejected");
    }
    info!("{} API key(s) registered", registry.len());

    let state = AppState::new(Arc::new(config), registry);

    let app = routes::router(state.clone()).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&state.config.server.listen)
        .await
        .expect("Failed to bind");

    info!("Server ready");

    // Graceful shutdown
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM");
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("Received SIGINT");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Server error");

    info!("Goodbye");
}
