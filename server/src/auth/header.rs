//! `Authorization` header parsing for the two wire formats that accumulated
//! over the protocol's history.
//!
//! - `HMAC-SHA256 apiKey=<k>,timestamp=<ms>,nonce=<b64>,signature=<b64>` —
//!   the canonical format. `Bearer` is accepted as an alias and treated
//!   identically.
//! - `Admin <apiKey>:<ms>:<nonce>:<hexsig>` — colon-delimited legacy format
//!   used only by the admin gate.
//!
//! The two parsers are deliberately separate functions: the gates dispatch on
//! which one they were built for, never on header sniffing. Parsing is
//! all-or-nothing — a missing field or non-numeric timestamp invalidates the
//! whole header and yields `None`, never a partial result.

/// The four client-supplied authentication parameters, as parsed off the
/// wire. Signature encoding depends on the scheme that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub timestamp_ms: i64,
    pub nonce: String,
    pub signature: String,
}

/// Parse the canonical `HMAC-SHA256` (or aliased `Bearer`) header format.
#[must_use]
pub fn parse_hmac_header(value: &str) -> Option<Credentials> {
    let rest = value
        .strip_prefix("HMAC-SHA256 ")
        .or_else(|| value.strip_prefix("Bearer "))?;

    let mut api_key = None;
    let mut timestamp_ms = None;
    let mut nonce = None;
    let mut signature = None;

    for part in rest.split(',') {
        // split_once stops at the first '=', so base64 padding in values survives
        let (k, v) = part.trim().split_once('=')?;
        match k {
            "apiKey" => api_key = Some(v.to_string()),
            "timestamp" => timestamp_ms = Some(v.parse::<i64>().ok()?),
            "nonce" => nonce = Some(v.to_string()),
            "signature" => signature = Some(v.to_string()),
            _ => {}
        }
    }

    Some(Credentials {
        api_key: non_empty(api_key?)?,
        timestamp_ms: timestamp_ms?,
        nonce: non_empty(nonce?)?,
        signature: non_empty(signature?)?,
    })
}

/// Parse the legacy `Admin <apiKey>:<ms>:<nonce>:<hexsig>` format — exactly
/// four colon-delimited parts, no more, no fewer.
#[must_use]
pub fn parse_admin_header(value: &str) -> Option<Credentials> {
    let rest = value.strip_prefix("Admin ")?;
    let parts: Vec<&str> = rest.split(':').collect();
    if parts.len() != 4 {
        return None;
    }

    Some(Credentials {
        api_key: non_empty(parts[0].to_string())?,
        timestamp_ms: parts[1].parse::<i64>().ok()?,
        nonce: non_empty(parts[2].to_string())?,
        signature: non_empty(parts[3].to_string())?,
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
