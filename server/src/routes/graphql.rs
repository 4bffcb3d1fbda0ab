//! Authenticated app-facing endpoints.
//!
//! The gateway sits in front of the merchant app's GraphQL layer; these
//! handlers are that inner layer's seam. They consume the [`AuthContext`]
//! the gate attached and echo the authenticated identity back, which is all
//! the protocol needs from them.

use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::auth::AuthContext;

/// `POST /graphql` — forward point into the app layer.
///
/// Responds with the query it received and the identity the gate attached,
/// so signing clients can verify the full round trip.
pub async fn graphql(
    auth: Option<Extension<AuthContext>>,
    body: Option<Json<Value>>,
) -> Json<Value> {
    let query = body
        .as_ref()
        .and_then(|Json(v)| v.get("query").cloned())
        .unwrap_or(Value::Null);
    Json(json!({
        "data": {
            "query": query,
            "authenticatedApiKey": auth.map(|Extension(ctx)| ctx.api_key),
        },
    }))
}

/// `GET /api/whoami` — report the authenticated identity, if any.
///
/// In optional mode the gate may pass requests through without an identity;
/// `apiKey` is `null` in that case.
pub async fn whoami(auth: Option<Extension<AuthContext>>) -> Json<Value> {
    match auth {
        Some(Extension(ctx)) => Json(json!({
            "success": true,
            "data": {
                "apiKey": ctx.api_key,
                "timestamp": ctx.timestamp_ms,
                "nonce": ctx.nonce,
            },
        })),
        None => Json(json!({
            "success": true,
            "data": { "apiKey": null },
        })),
    }
}
