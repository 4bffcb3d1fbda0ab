//! Signing HTTP client for keygate endpoints.
//!
//! [`SignedClient`] wraps `reqwest::Client` and signs every request with the
//! shared protocol primitives from the `keygate` crate, so the client and the
//! verifying gate can never disagree about canonicalization. All responses
//! are returned as `serde_json::Value` — the CLI layer handles formatting.
//!
//! ## Authentication
//!
//! App endpoints use the canonical scheme (base64 signature):
//!
//! ```text
//! Authorization: HMAC-SHA256 apiKey=<k>,timestamp=<ms>,nonce=<b64>,signature=<b64>
//! ```
//!
//! Admin endpoints use the legacy colon-delimited scheme (hex signature):
//!
//! ```text
//! Authorization: Admin <k>:<ms>:<b64-nonce>:<hexsig>
//! ```
//!
//! JSON bodies are serialized with sorted top-level keys and the exact signed
//! bytes are what goes on the wire, since the server hashes the body
//! byte-for-byte.

use std::time::Duration;

use serde_json::Value;

use keygate::auth::canonical::{
    build_query_string, canonical_json_body, generate_nonce, hash_body_bytes, now_ms,
    string_to_sign, DEFAULT_NONCE_BYTES,
};
use keygate::auth::signature::{sign, sign_hex};

/// Which header format to emit.
#[derive(Debug, Clone, Copy)]
enum Scheme {
    Hmac,
    Admin,
}

/// Build the `Authorization` header value for one request. Pure so the wire
/// format is testable without a socket.
fn authorization_header(
    scheme: Scheme,
    api_key: &str,
    secret: &str,
    method: &str,
    path: &str,
    query_string: &str,
    body_hash: &str,
    timestamp_ms: i64,
    nonce: &str,
) -> String {
    let sts = string_to_sign(method, path, query_string, body_hash, timestamp_ms, nonce);
    match scheme {
        Scheme::Hmac => format!(
            "HMAC-SHA256 apiKey={api_key},timestamp={timestamp_ms},nonce={nonce},signature={}",
            sign(secret, &sts)
        ),
        Scheme::Admin => format!(
            "Admin {api_key}:{timestamp_ms}:{nonce}:{}",
            sign_hex(secret, &sts)
        ),
    }
}

/// HTTP client for a single keygate server.
pub struct SignedClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    secret: String,
}

impl SignedClient {
    /// Create a new client for a keygate server at the given URL.
    pub fn new(base_url: String, api_key: String, secret: String) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        // Strip trailing slash for consistent URL construction
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            api_key,
            secret,
        }
    }

    /// `GET /api/health` — liveness check (no auth required).
    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `GET /api/whoami` — echo the authenticated identity.
    pub async fn whoami(&self) -> Result<Value, ClientError> {
        self.get(Scheme::Hmac, "/api/whoami", &[]).await
    }

    /// `POST /graphql` — send a query to the app layer.
    pub async fn graphql(&self, query: &str) -> Result<Value, ClientError> {
        self.post_json(Scheme::Hmac, "/graphql", &serde_json::json!({ "query": query }))
            .await
    }

    /// `GET /admin/keys` — list registered keys (secrets redacted).
    pub async fn keys_list(&self) -> Result<Value, ClientError> {
        self.get(Scheme::Admin, "/admin/keys", &[]).await
    }

    /// `POST /admin/keys` — register a key.
    pub async fn keys_add(
        &self,
        key: &str,
        secret: &str,
        name: Option<&str>,
    ) -> Result<Value, ClientError> {
        let mut body = serde_json::json!({ "key": key, "secret": secret });
        if let Some(n) = name {
            body["name"] = serde_json::json!(n);
        }
        self.post_json(Scheme::Admin, "/admin/keys", &body).await
    }

    /// `POST /admin/keys/{key}/enable`
    pub async fn keys_enable(&self, key: &str) -> Result<Value, ClientError> {
        self.post_json(Scheme::Admin, &format!("/admin/keys/{key}/enable"), &Value::Null)
            .await
    }

    /// `POST /admin/keys/{key}/disable`
    pub async fn keys_disable(&self, key: &str) -> Result<Value, ClientError> {
        self.post_json(Scheme::Admin, &format!("/admin/keys/{key}/disable"), &Value::Null)
            .await
    }

    /// `DELETE /admin/keys/{key}`
    pub async fn keys_remove(&self, key: &str) -> Result<Value, ClientError> {
        let auth = self.authorization(Scheme::Admin, "DELETE", &format!("/admin/keys/{key}"), "", "");
        let resp = self
            .http
            .delete(format!("{}/admin/keys/{key}", self.base_url))
            .header("authorization", auth)
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    fn authorization(
        &self,
        scheme: Scheme,
        method: &str,
        path: &str,
        query_string: &str,
        body_hash: &str,
    ) -> String {
        authorization_header(
            scheme,
            &self.api_key,
            &self.secret,
            method,
            path,
            query_string,
            body_hash,
            now_ms(),
            &generate_nonce(DEFAULT_NONCE_BYTES),
        )
    }

    async fn get(
        &self,
        scheme: Scheme,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        // The URL carries the canonical query string itself, so what the
        // server re-canonicalizes is exactly what was signed.
        let qs = build_query_string(query);
        let url = if qs.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{qs}", self.base_url)
        };
        let auth = self.authorization(scheme, "GET", path, &qs, "");
        let resp = self
            .http
            .get(url)
            .header("authorization", auth)
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    async fn post_json(
        &self,
        scheme: Scheme,
        path: &str,
        body: &Value,
    ) -> Result<Value, ClientError> {
        let body_string = canonical_json_body(body);
        let body_hash = hash_body_bytes(body_string.as_deref().unwrap_or("").as_bytes());
        let auth = self.authorization(scheme, "POST", path, "", &body_hash);

        let mut req = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("authorization", auth);
        if let Some(s) = body_string {
            req = req.header("content-type", "application/json").body(s);
        }
        let resp = req.send().await.map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// Parse an HTTP response — returns the JSON body on success, or a
    /// [`ClientError`] with the server's error message on failure.
    async fn handle_response(resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        let body = resp.text().await.map_err(ClientError::Request)?;

        if status.is_success() {
            serde_json::from_str(&body)
                .map_err(|e| ClientError::Protocol(format!("Invalid JSON from server: {e}")))
        } else {
            // Try to extract the message from the error envelope
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Errors returned by [`SignedClient`] methods.
#[derive(Debug)]
pub enum ClientError {
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.).
    Request(reqwest::Error),
    /// The server returned a non-2xx HTTP status.
    Api { status: u16, message: String },
    /// The response body was not valid JSON.
    Protocol(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Request(e) => write!(f, "HTTP request failed: {e}"),
            ClientError::Api { status, message } => {
                write!(f, "Server error (HTTP {status}): {message}")
            }
            ClientError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate::auth::header::{parse_admin_header, parse_hmac_header};
    use keygate::auth::signature::verify;

    #[test]
    fn test_hmac_header_round_trips_through_server_parser() {
        let header = authorization_header(
            Scheme::Hmac,
            "k1",
            "shared-secret",
            "post",
            "/graphql",
            "a=1",
            "HASH",
            1_700_000_000_000,
            "bm9uY2U=",
        );

        let creds = parse_hmac_header(&header).unwrap();
        assert_eq!(creds.api_key, "k1");
        assert_eq!(creds.timestamp_ms, 1_700_000_000_000);
        assert_eq!(creds.nonce, "bm9uY2U=");

        // The verifier rebuilds the same canonical string and must agree.
        let sts = string_to_sign("POST", "/graphql", "a=1", "HASH", 1_700_000_000_000, "bm9uY2U=");
        assert!(verify(&creds.signature, &sign("shared-secret", &sts)));
    }

    #[test]
    fn test_admin_header_round_trips_through_server_parser() {
        let header = authorization_header(
            Scheme::Admin,
            "admin",
            "shared-secret",
            "GET",
            "/admin/keys",
            "",
            "",
            1_700_000_000_000,
            "bm9uY2U=",
        );

        let creds = parse_admin_header(&header).unwrap();
        let sts = string_to_sign("GET", "/admin/keys", "", "", 1_700_000_000_000, "bm9uY2U=");
        assert!(verify(&creds.signature, &sign_hex("shared-secret", &sts)));
        // Hex, not base64: the two gate encodings are not interchangeable.
        assert!(!verify(&creds.signature, &sign("shared-secret", &sts)));
    }
}
