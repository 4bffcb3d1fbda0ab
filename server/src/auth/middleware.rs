//! Request authentication gates.
//!
//! Two axum middleware functions share one verification pipeline and differ
//! only in wire format: [`require_signature`] speaks the canonical
//! `HMAC-SHA256`/`Bearer` scheme with base64 signatures, and
//! [`require_admin_signature`] speaks the legacy colon-delimited `Admin`
//! scheme with hex signatures.
//!
//! Pipeline: parse header → validate timestamp → look up the key → buffer the
//! body and rebuild the canonical string from the live request → recompute
//! the signature → constant-time compare. Acceptance attaches an
//! [`AuthContext`] to the request and calls the inner handler; any rejection
//! short-circuits with the structured 401/500 envelope from
//! [`crate::auth::error::AuthError`].
//!
//! The development bypass (generic gate only) treats header-less requests as
//! authenticated under the [`DEV_BYPASS_IDENTITY`] sentinel. It requires an
//! explicitly non-production classification and is refused unconditionally in
//! production.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::auth::canonical::{
    canonicalize_raw_query, hash_body_bytes, now_ms, string_to_sign, validate_timestamp,
};
use crate::auth::error::AuthError;
use crate::auth::header::{parse_admin_header, parse_hmac_header, Credentials};
use crate::auth::signature::{sign, sign_hex, verify};
use crate::config::AuthConfig;
use crate::state::AppState;

/// Sentinel API key attached when the development bypass admits a request.
pub const DEV_BYPASS_IDENTITY: &str = "dev-bypass";

/// Authenticated identity attached to the request on acceptance.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub api_key: String,
    pub timestamp_ms: i64,
    pub nonce: String,
}

/// Which wire format a gate speaks.
#[derive(Debug, Clone, Copy)]
enum Gate {
    /// `HMAC-SHA256` / `Bearer` comma-kv header, base64 signature.
    Hmac,
    /// `Admin k:ts:nonce:sig` header, hex signature. No dev bypass, and
    /// optional mode does not apply: key mutations are never reachable
    /// unsigned.
    Admin,
}

impl Gate {
    fn parse(self, header: &str) -> Option<Credentials> {
        match self {
            Self::Hmac => parse_hmac_header(header),
            Self::Admin => parse_admin_header(header),
        }
    }

    fn expected_signature(self, secret: &str, string_to_sign: &str) -> String {
        match self {
            Self::Hmac => sign(secret, string_to_sign),
            Self::Admin => sign_hex(secret, string_to_sign),
        }
    }

    fn allows_bypass(self) -> bool {
        matches!(self, Self::Hmac)
    }

    fn honors_optional_mode(self) -> bool {
        matches!(self, Self::Hmac)
    }
}

/// Generic API gate: `Authorization: HMAC-SHA256 apiKey=…,timestamp=…,nonce=…,signature=…`.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request, Gate::Hmac).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// Admin gate: `Authorization: Admin <apiKey>:<ms>:<nonce>:<hexsig>`.
pub async fn require_admin_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request, Gate::Admin).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn authenticate(
    state: &AppState,
    request: Request,
    gate: Gate,
) -> Result<Request, AuthError> {
    let auth = &state.config.auth;

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(header) = header else {
        if gate.allows_bypass() && auth.bypass_active() {
            debug!("no Authorization header, admitting under dev bypass");
            let mut request = request;
            request.extensions_mut().insert(AuthContext {
                api_key: DEV_BYPASS_IDENTITY.to_string(),
                timestamp_ms: now_ms(),
                nonce: String::new(),
            });
            return Ok(request);
        }
        return soft_fail(auth, gate, request, AuthError::MissingHeader);
    };

    let Some(creds) = gate.parse(&header) else {
        return soft_fail(auth, gate, request, AuthError::MalformedHeader);
    };

    if !validate_timestamp(creds.timestamp_ms, auth.timestamp_tolerance_ms) {
        return soft_fail(auth, gate, request, AuthError::StaleOrFutureTimestamp);
    }

    let Some(record) = state.registry.get(&creds.api_key) else {
        return soft_fail(auth, gate, request, AuthError::UnknownOrDisabledKey);
    };

    // The canonical string covers the body hash, so the body must be buffered
    // here and handed back to the inner handler afterwards.
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|e| AuthError::Internal(format!("failed to buffer request body: {e}")))?;

    let query_string = canonicalize_raw_query(parts.uri.query().unwrap_or(""));
    let body_hash = hash_body_bytes(&bytes);
    let string_to_sign = string_to_sign(
        parts.method.as_str(),
        parts.uri.path(),
        &query_string,
        &body_hash,
        creds.timestamp_ms,
        &creds.nonce,
    );
    let expected = gate.expected_signature(&record.secret, &string_to_sign);

    if !auth.is_production() {
        // Diagnosis aid; must stay out of production logs.
        debug!(
            api_key = %creds.api_key,
            string_to_sign = ?string_to_sign,
            expected_prefix = %&expected[..8.min(expected.len())],
            "recomputed request signature"
        );
    }

    if !verify(&creds.signature, &expected) {
        // A present-but-wrong signature rejects even in optional mode.
        return Err(AuthError::SignatureMismatch);
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(AuthContext {
        api_key: creds.api_key,
        timestamp_ms: creds.timestamp_ms,
        nonce: creds.nonce,
    });
    Ok(request)
}

/// In optional mode, pre-signature failures fall through to the handler with
/// no identity attached instead of rejecting. The admin gate never falls
/// through.
fn soft_fail(
    auth: &AuthConfig,
    gate: Gate,
    request: Request,
    err: AuthError,
) -> Result<Request, AuthError> {
    if auth.required || !gate.honors_optional_mode() {
        Err(err)
    } else {
        debug!("authentication not required, passing through after: {err}");
        Ok(request)
    }
}
