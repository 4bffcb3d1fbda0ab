#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_async)]

//! keygate library — exposes the authentication protocol for downstream
//! crates (the signing client uses the same canonicalization and signature
//! primitives as the verifying gates, so the two cannot drift).
//!
//! - `auth` — canonical string construction, HMAC signature engine, header
//!   parsers, API key registry, request gates
//! - `config` — configuration loading
//! - `routes` — HTTP route handlers and router assembly
//! - `state` — shared application state

pub mod auth;
pub mod config;
pub mod routes;
pub mod state;

// Re-export key types at crate root for convenience.
pub use auth::{ApiKeyRecord, ApiKeyRegistry, AuthContext, AuthError};
pub use config::Config;
pub use state::AppState;
