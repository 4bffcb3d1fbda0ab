//! Authentication failure taxonomy and the JSON error envelope.
//!
//! Every rejection renders as:
//!
//! ```json
//! { "success": false, "error": { "message": "...", "extensions": { "code": "UNAUTHORIZED" } } }
//! ```
//!
//! with HTTP 401, except internal faults which render the same envelope with
//! `INTERNAL_SERVER_ERROR` and HTTP 500. Unknown-key and signature-mismatch
//! failures share one generic message so a probing client cannot tell which
//! check failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Why an authentication attempt was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header and no bypass applies.
    #[error("Missing Authorization header")]
    MissingHeader,
    /// Header present but unparsable or missing required fields.
    #[error("Malformed Authorization header")]
    MalformedHeader,
    /// Claimed send time outside the freshness window, in either direction.
    #[error("Request timestamp is too old or too far in the future")]
    StaleOrFutureTimestamp,
    /// API key absent from the registry or disabled. Message intentionally
    /// indistinguishable from [`AuthError::SignatureMismatch`].
    #[error("Invalid API credentials")]
    UnknownOrDisabledKey,
    /// Recomputed signature differs from the provided one.
    #[error("Invalid API credentials")]
    SignatureMismatch,
    /// Unexpected fault while verifying; detail goes to server logs only.
    #[error("Internal error during authentication: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code carried in `error.extensions.code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
            _ => "UNAUTHORIZED",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Client-facing message. Internal detail never leaves the process.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            tracing::error!("authentication internal error: {detail}");
        }
        (
            self.status(),
            Json(json!({
                "success": false,
                "error": {
                    "message": self.public_message(),
                    "extensions": { "code": self.code() },
                },
            })),
        )
            .into_response()
    }
}
