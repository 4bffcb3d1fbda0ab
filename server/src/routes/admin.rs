//! Admin key-management endpoints.
//!
//! Registry mutations for the merchant dashboard: list, add, enable, disable,
//! remove. All routes sit behind the admin gate; secrets never appear in any
//! response. Mutations are runtime-only — a restart reloads the registry from
//! configuration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::ApiKeyRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddKeyRequest {
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `GET /admin/keys` — all records, secrets redacted.
pub async fn list_keys(State(state): State<AppState>) -> Response {
    Json(json!({
        "success": true,
        "data": { "keys": state.registry.list() },
    }))
    .into_response()
}

/// `POST /admin/keys` — register a key. Re-adding an existing key overwrites
/// it (last write wins).
pub async fn add_key(
    State(state): State<AppState>,
    Json(req): Json<AddKeyRequest>,
) -> Response {
    let mut record = ApiKeyRecord::new(req.key, req.secret);
    record.name = req.name;
    record.description = req.description;
    let key = record.key.clone();

    if state.registry.add(record) {
        (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": { "key": key } })),
        )
            .into_response()
    } else {
        error_response(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            "key and secret must be non-empty",
        )
    }
}

/// `POST /admin/keys/{key}/enable`
pub async fn enable_key(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    mutation_response(state.registry.enable(&key), &key)
}

/// `POST /admin/keys/{key}/disable` — the record is kept and listed, but
/// becomes invisible to lookups until re-enabled.
pub async fn disable_key(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    mutation_response(state.registry.disable(&key), &key)
}

/// `DELETE /admin/keys/{key}`
pub async fn remove_key(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    mutation_response(state.registry.remove(&key), &key)
}

fn mutation_response(found: bool, key: &str) -> Response {
    if found {
        Json(json!({ "success": true, "data": { "key": key } })).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "unknown API key")
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": { "message": message, "extensions": { "code": code } },
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::canonical::{
        generate_nonce, hash_body_bytes, now_ms, string_to_sign, DEFAULT_NONCE_BYTES,
    };
    use crate::auth::registry::ApiKeyRegistry;
    use crate::auth::signature::sign_hex;
    use crate::config::Config;
    use crate::routes;

    const SECRET: &str = "admin-secret-admin-secret-admin!";

    fn admin_state() -> AppState {
        let mut config = Config::default();
        config.auth.environment = Some("production".to_string());
        let registry = ApiKeyRegistry::new();
        registry.add(ApiKeyRecord::new("admin", SECRET));
        AppState::new(Arc::new(config), Arc::new(registry))
    }

    fn admin_request(method: &str, path: &str, body: Option<Value>) -> Request<Body> {
        let timestamp_ms = now_ms();
        let nonce = generate_nonce(DEFAULT_NONCE_BYTES);
        let body_string = body.map(|v| v.to_string()).unwrap_or_default();
        let sts = string_to_sign(
            method,
            path,
            "",
            &hash_body_bytes(body_string.as_bytes()),
            timestamp_ms,
            &nonce,
        );
        let signature = sign_hex(SECRET, &sts);

        let mut builder = Request::builder().method(method).uri(path).header(
            "authorization",
            format!("Admin admin:{timestamp_ms}:{nonce}:{signature}"),
        );
        if !body_string.is_empty() {
            builder = builder.header("content-type", "application/json");
        }
        builder.body(Body::from(body_string)).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_key_lifecycle_over_http() {
        let state = admin_state();
        let app = || routes::router(state.clone());

        // add
        let response = app()
            .oneshot(admin_request(
                "POST",
                "/admin/keys",
                Some(json!({
                    "key": "k9",
                    "secret": "ninth-secret-ninth-secret-ninth!",
                    "name": "ninth",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // disable, then the key is listed but disabled
        let response = app()
            .oneshot(admin_request("POST", "/admin/keys/k9/disable", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.registry.get("k9").is_none());

        let response = app()
            .oneshot(admin_request("GET", "/admin/keys", None))
            .await
            .unwrap();
        let body = json_body(response).await;
        let keys = body["data"]["keys"].as_array().unwrap();
        let k9 = keys.iter().find(|k| k["key"] == "k9").unwrap();
        assert_eq!(k9["enabled"], false);
        assert!(k9.get("secret").is_none());

        // remove
        let response = app()
            .oneshot(admin_request("DELETE", "/admin/keys/k9", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(admin_request("DELETE", "/admin/keys/k9", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_rejects_empty_secret() {
        let state = admin_state();
        let response = routes::router(state)
            .oneshot(admin_request(
                "POST",
                "/admin/keys",
                Some(json!({"key": "k9", "secret": ""})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
