//! In-memory API key registry.
//!
//! The registry is constructor-injected (handlers receive it through
//! [`crate::AppState`]) rather than process-global, so tests can build
//! isolated registries without shared-state leakage. There is no persistence:
//! a restart reloads only what [`ApiKeyRegistry::bootstrap`] derives from
//! configuration, and any runtime additions are lost.
//!
//! Mutation is administrative and infrequent; the lock is a plain `RwLock`
//! and no transactional guarantees are made. A disable racing a lookup can
//! let one in-flight request through with a just-disabled key, which is
//! accepted.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::canonical::now_ms;

/// Secrets shorter than this log a warning when registered. They are still
/// accepted — rejecting would brick deployments with historical short keys.
pub const MIN_SECRET_LEN: usize = 32;

/// Fixed development credentials, registered only outside production.
/// Publicly documented; never valid in a production process.
pub const DEV_API_KEY: &str = "dev-key";
pub const DEV_API_SECRET: &str = "dev-secret-0000000000000000000000000000";

/// A registered key/secret pair plus display metadata.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key: String,
    pub secret: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at_ms: i64,
    pub last_used_at_ms: Option<i64>,
}

impl ApiKeyRecord {
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            name: None,
            description: None,
            enabled: true,
            created_at_ms: now_ms(),
            last_used_at_ms: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A key record as exposed by listings — everything but the secret.
#[derive(Debug, Clone, Serialize)]
pub struct RedactedApiKey {
    pub key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at_ms: i64,
    pub last_used_at_ms: Option<i64>,
}

impl From<&ApiKeyRecord> for RedactedApiKey {
    fn from(r: &ApiKeyRecord) -> Self {
        Self {
            key: r.key.clone(),
            name: r.name.clone(),
            description: r.description.clone(),
            enabled: r.enabled,
            created_at_ms: r.created_at_ms,
            last_used_at_ms: r.last_used_at_ms,
        }
    }
}

/// Thread-safe key store. See the module docs for the concurrency contract.
#[derive(Debug, Default)]
pub struct ApiKeyRegistry {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
}

impl ApiKeyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record. Re-adding an existing key overwrites it entirely
    /// (last write wins, no merge). Returns `false` and registers nothing if
    /// key or secret is empty.
    pub fn add(&self, record: ApiKeyRecord) -> bool {
        if record.key.is_empty() || record.secret.is_empty() {
            warn!("refusing to register API key with empty key or secret");
            return false;
        }
        if record.secret.len() < MIN_SECRET_LEN {
            warn!(
                key = %record.key,
                "API secret is shorter than {MIN_SECRET_LEN} characters"
            );
        }
        self.lock_write().insert(record.key.clone(), record);
        true
    }

    /// Look up an enabled key, refreshing its `last_used_at` stamp.
    ///
    /// Disabled keys are invisible here — callers cannot distinguish
    /// "disabled" from "never existed". The stamp refresh is a side effect of
    /// lookup, not of signature verification succeeding.
    pub fn get(&self, key: &str) -> Option<ApiKeyRecord> {
        let mut keys = self.lock_write();
        let record = keys.get_mut(key)?;
        if !record.enabled {
            return None;
        }
        record.last_used_at_ms = Some(now_ms());
        Some(record.clone())
    }

    /// All records, secrets redacted, sorted by key for stable output.
    /// Disabled keys are included (with `enabled: false`).
    pub fn list(&self) -> Vec<RedactedApiKey> {
        let keys = self.keys.read().expect("api key registry lock poisoned");
        let mut out: Vec<RedactedApiKey> = keys.values().map(RedactedApiKey::from).collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Returns `false` if the key is unknown.
    pub fn enable(&self, key: &str) -> bool {
        self.set_enabled(key, true)
    }

    /// Returns `false` if the key is unknown. The record is retained and
    /// still visible in [`ApiKeyRegistry::list`].
    pub fn disable(&self, key: &str) -> bool {
        self.set_enabled(key, false)
    }

    /// Returns `false` if the key is unknown.
    pub fn remove(&self, key: &str) -> bool {
        self.lock_write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.read().expect("api key registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_enabled(&self, key: &str, enabled: bool) -> bool {
        match self.lock_write().get_mut(key) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ApiKeyRecord>> {
        self.keys.write().expect("api key registry lock poisoned")
    }

    /// Populate the registry from configuration at process start.
    ///
    /// Order: the primary pair when both halves are present (absence is
    /// tolerated), the fixed development pair outside production, then each
    /// `key:secret` slot from the config plus indexed `KEYGATE_KEY_n`
    /// environment slots, scanned from 1 until the first gap.
    pub fn bootstrap(&self, auth: &crate::config::AuthConfig) {
        match (&auth.api_key, &auth.api_secret) {
            (Some(key), Some(secret)) => {
                if self.add(ApiKeyRecord::new(key, secret).named("primary")) {
                    info!(key = %key, "registered primary API key");
                }
            }
            (None, None) => {}
            _ => warn!("primary API key and secret must both be set; ignoring the half that is"),
        }

        if !auth.is_production() {
            self.add(ApiKeyRecord::new(DEV_API_KEY, DEV_API_SECRET).named("development"));
            info!("registered fixed development API key (non-production only)");
        }

        self.register_slots(&auth.keys);
        self.register_slots(&indexed_env_slots());
    }

    /// Register `key:secret` slot strings. A slot without a secret half is
    /// skipped with a warning.
    pub fn register_slots(&self, slots: &[String]) {
        for slot in slots {
            match slot.split_once(':') {
                Some((key, secret)) if !key.is_empty() && !secret.is_empty() => {
                    if self.add(ApiKeyRecord::new(key, secret)) {
                        info!(key = %key, "registered API key from slot");
                    }
                }
                _ => warn!(slot = %slot, "ignoring malformed key slot (expected key:secret)"),
            }
        }
    }
}

/// Scan `KEYGATE_KEY_1`, `KEYGATE_KEY_2`, … until the first unset index.
/// Each value is either `key:secret` or a bare key whose secret lives in the
/// sibling `KEYGATE_SECRET_n` variable.
fn indexed_env_slots() -> Vec<String> {
    let mut slots = Vec::new();
    for i in 1.. {
        let Ok(raw) = std::env::var(format!("KEYGATE_KEY_{i}")) else {
            break;
        };
        if raw.contains(':') {
            slots.push(raw);
        } else if let Ok(secret) = std::env::var(format!("KEYGATE_SECRET_{i}")) {
            slots.push(format!("{raw}:{secret}"));
        } else {
            warn!("KEYGATE_KEY_{i} has no ':' and no sibling KEYGATE_SECRET_{i}; skipping");
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> String {
        "s".repeat(MIN_SECRET_LEN)
    }

    #[test]
    fn test_add_and_get() {
        let registry = ApiKeyRegistry::new();
        assert!(registry.add(ApiKeyRecord::new("k1", secret())));
        let record = registry.get("k1").unwrap();
        assert_eq!(record.secret, secret());
        assert!(record.last_used_at_ms.is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_add_rejects_empty_parts() {
        let registry = ApiKeyRegistry::new();
        assert!(!registry.add(ApiKeyRecord::new("", secret())));
        assert!(!registry.add(ApiKeyRecord::new("k1", "")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_short_secret_accepted() {
        let registry = ApiKeyRegistry::new();
        assert!(registry.add(ApiKeyRecord::new("k1", "short")));
        assert!(registry.get("k1").is_some());
    }

    #[test]
    fn test_readd_overwrites() {
        let registry = ApiKeyRegistry::new();
        registry.add(ApiKeyRecord::new("k1", secret()).named("first"));
        registry.add(ApiKeyRecord::new("k1", "other-secret-other-secret-other!"));
        let record = registry.get("k1").unwrap();
        assert_eq!(record.secret, "other-secret-other-secret-other!");
        // Last write wins: metadata from the first record is gone.
        assert_eq!(record.name, None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disabled_key_invisible_but_listed() {
        let registry = ApiKeyRegistry::new();
        registry.add(ApiKeyRecord::new("k1", secret()));
        assert!(registry.disable("k1"));
        assert!(registry.get("k1").is_none());

        let listing = registry.list();
        assert_eq!(listing.len(), 1);
        assert!(!listing[0].enabled);

        assert!(registry.enable("k1"));
        assert!(registry.get("k1").is_some());
    }

    #[test]
    fn test_unknown_key_operations_return_false() {
        let registry = ApiKeyRegistry::new();
        assert!(!registry.enable("nope"));
        assert!(!registry.disable("nope"));
        assert!(!registry.remove("nope"));
    }

    #[test]
    fn test_list_redacts_secret() {
        let registry = ApiKeyRegistry::new();
        registry.add(ApiKeyRecord::new("k1", secret()).named("primary"));
        let json = serde_json::to_string(&registry.list()).unwrap();
        assert!(!json.contains(&secret()));
        assert!(json.contains("primary"));
    }

    #[test]
    fn test_get_refreshes_last_used() {
        let registry = ApiKeyRegistry::new();
        registry.add(ApiKeyRecord::new("k1", secret()));
        assert!(registry.list()[0].last_used_at_ms.is_none());
        registry.get("k1").unwrap();
        assert!(registry.list()[0].last_used_at_ms.is_some());
    }

    fn auth_config(environment: Option<&str>) -> crate::config::AuthConfig {
        crate::config::AuthConfig {
            environment: environment.map(str::to_string),
            ..crate::config::AuthConfig::default()
        }
    }

    #[test]
    fn test_bootstrap_dev_pair_only_outside_production() {
        let registry = ApiKeyRegistry::new();
        registry.bootstrap(&auth_config(Some("development")));
        assert!(registry.get(DEV_API_KEY).is_some());

        let registry = ApiKeyRegistry::new();
        registry.bootstrap(&auth_config(None)); // unclassified ⇒ development
        assert!(registry.get(DEV_API_KEY).is_some());

        let registry = ApiKeyRegistry::new();
        registry.bootstrap(&auth_config(Some("production")));
        assert!(registry.get(DEV_API_KEY).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bootstrap_registers_primary_and_slots() {
        let mut auth = auth_config(Some("production"));
        auth.api_key = Some("k1".to_string());
        auth.api_secret = Some(secret());
        auth.keys = vec![format!("k2:{}", secret())];

        let registry = ApiKeyRegistry::new();
        registry.bootstrap(&auth);
        assert_eq!(registry.get("k1").unwrap().name.as_deref(), Some("primary"));
        assert!(registry.get("k2").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_bootstrap_half_primary_pair_ignored() {
        let mut auth = auth_config(Some("production"));
        auth.api_key = Some("k1".to_string());
        // secret half missing: the pair is skipped, not partially applied
        let registry = ApiKeyRegistry::new();
        registry.bootstrap(&auth);
        assert!(registry.get("k1").is_none());
        assert!(registry.is_empty());

        let mut auth = auth_config(Some("production"));
        auth.api_secret = Some(secret());
        let registry = ApiKeyRegistry::new();
        registry.bootstrap(&auth);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_slots() {
        let registry = ApiKeyRegistry::new();
        registry.register_slots(&[
            "k2:second-secret-second-secret-second".to_string(),
            "malformed".to_string(),
            ":nokey".to_string(),
        ]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("k2").is_some());
    }
}
