//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** — `KEYGATE_API_KEY`, `KEYGATE_API_SECRET`,
//!    `KEYGATE_LISTEN`, `KEYGATE_ENV`, plus the indexed key slots
//!    `KEYGATE_KEY_1`, `KEYGATE_KEY_2`, … consumed at registry bootstrap
//! 2. **Config file** — path via `--config <path>`, or `keygate.toml` in CWD
//! 3. **Compiled defaults** — see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:4000"
//! max_body_bytes = 1048576  # 1 MB
//!
//! [auth]
//! environment = "production"      # omit ⇒ development, with a startup warning
//! required = true
//! allow_dev_bypass = true         # ignored whenever environment = "production"
//! timestamp_tolerance_ms = 300000
//! api_key = "k1"                  # primary pair; both halves or neither
//! api_secret = "your-signing-secret-at-least-32-chars"
//! keys = ["k2:second-secret", "k3:third-secret"]
//!
//! [logging]
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::auth::canonical::DEFAULT_TIMESTAMP_TOLERANCE_MS;

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:4000`).
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Maximum request body the auth gate will buffer for hashing (default 1 MB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Explicit runtime classification: `"production"` or `"development"`.
    /// When unset the process is classified as development and a warning is
    /// logged at startup, since that state enables the dev bypass by default.
    /// Override with `KEYGATE_ENV`.
    #[serde(default)]
    pub environment: Option<String>,
    /// When `false`, requests that fail before signature comparison pass
    /// through unauthenticated instead of being rejected (default `true`).
    #[serde(default = "default_true")]
    pub required: bool,
    /// Allow unauthenticated requests outside production when no
    /// `Authorization` header is present (default `true`). Never honored when
    /// `environment = "production"`.
    #[serde(default = "default_true")]
    pub allow_dev_bypass: bool,
    /// Freshness window for request timestamps in milliseconds (default 5 minutes).
    #[serde(default = "default_timestamp_tolerance_ms")]
    pub timestamp_tolerance_ms: i64,
    /// Primary API key. Override with `KEYGATE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Primary signing secret. Override with `KEYGATE_API_SECRET`.
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Additional `key:secret` slots registered at bootstrap.
    #[serde(default)]
    pub keys: Vec<String>,
}

impl AuthConfig {
    /// `true` only when the process is explicitly flagged as production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_deref(), Some("production"))
    }

    /// Whether the dev bypass applies to header-less requests. Refused
    /// unconditionally in production; there is no override.
    #[must_use]
    pub fn bypass_active(&self) -> bool {
        self.allow_dev_bypass && !self.is_production()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "0.0.0.0:4000".to_string()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1 MB
}
fn default_true() -> bool {
    true
}
fn default_timestamp_tolerance_ms() -> i64 {
    DEFAULT_TIMESTAMP_TOLERANCE_MS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            environment: None,
            required: default_true(),
            allow_dev_bypass: default_true(),
            timestamp_tolerance_ms: default_timestamp_tolerance_ms(),
            api_key: None,
            api_secret: None,
            keys: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, reads that file (panics on failure). Otherwise
    /// looks for `keygate.toml` in the current directory, falling back to
    /// compiled defaults.
    pub fn load(path: Option<&str>) -> Self {
        let mut config = if let Some(p) = path {
            let content = std::fs::read_to_string(p)
                .unwrap_or_else(|e| panic!("Failed to read config file {p}: {e}"));
            toml::from_str(&content)
                .unwrap_or_else(|e| panic!("Failed to parse config file {p}: {e}"))
        } else if Path::new("keygate.toml").exists() {
            let content =
                std::fs::read_to_string("keygate.toml").expect("Failed to read keygate.toml");
            toml::from_str(&content).expect("Failed to parse keygate.toml")
        } else {
            Config::default()
        };

        // Env var overrides
        if let Ok(key) = std::env::var("KEYGATE_API_KEY") {
            config.auth.api_key = Some(key);
        }
        if let Ok(secret) = std::env::var("KEYGATE_API_SECRET") {
            config.auth.api_secret = Some(secret);
        }
        if let Ok(env) = std::env::var("KEYGATE_ENV") {
            config.auth.environment = Some(env);
        }
        if let Ok(listen) = std::env::var("KEYGATE_LISTEN") {
            config.server.listen = listen;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen, "0.0.0.0:4000");
        assert!(config.auth.required);
        assert_eq!(config.auth.timestamp_tolerance_ms, 300_000);
        assert!(config.auth.environment.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            environment = "production"
            required = false
            api_key = "k1"
            api_secret = "s1"
            keys = ["k2:s2"]
            "#,
        )
        .unwrap();
        assert!(config.auth.is_production());
        assert!(!config.auth.required);
        assert_eq!(config.auth.api_key.as_deref(), Some("k1"));
        assert_eq!(config.auth.keys, vec!["k2:s2".to_string()]);
    }

    #[test]
    fn test_bypass_refused_in_production() {
        let mut auth = AuthConfig::default();
        assert!(auth.bypass_active()); // unset environment fails open

        auth.environment = Some("production".to_string());
        assert!(!auth.bypass_active()); // no override exists

        auth.environment = Some("development".to_string());
        auth.allow_dev_bypass = false;
        assert!(!auth.bypass_active());
    }
}
