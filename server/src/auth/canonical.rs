//! Canonical request components: nonce generation, the timestamp freshness
//! window, query-string and body canonicalization, and the newline-joined
//! string to sign.
//!
//! Signer and verifier must construct the exact same byte sequence or every
//! request fails, so all normalization rules live here and nowhere else:
//!
//! ```text
//! METHOD\nPATH\nQUERYSTRING\nBODYHASH\nTIMESTAMP\nNONCE
//! ```
//!
//! Absent components are represented as empty strings, never omitted — the
//! string to sign always has exactly six lines.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default freshness window for request timestamps: 5 minutes either side.
pub const DEFAULT_TIMESTAMP_TOLERANCE_MS: i64 = 300_000;

/// Default nonce size in bytes (before base64 encoding).
pub const DEFAULT_NONCE_BYTES: usize = 16;

/// Characters percent-encoded in canonical query keys and values: everything
/// except RFC 3986 unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Generate `byte_len` cryptographically random bytes, base64-encoded.
///
/// The nonce is opaque; it exists only to make two otherwise identical
/// requests sign differently.
#[must_use]
pub fn generate_nonce(byte_len: usize) -> String {
    let mut buf = vec![0u8; byte_len];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    BASE64.encode(buf)
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

/// Check that `timestamp_ms` is within `max_diff_ms` of the current time.
///
/// Rejects timestamps too far in the future as well as stale ones, so a
/// skewed client clock cannot widen the replay window in either direction.
/// This check is stateless: it bounds how long a captured request stays
/// valid, it does not detect a replay inside the window.
#[must_use]
pub fn validate_timestamp(timestamp_ms: i64, max_diff_ms: i64) -> bool {
    validate_timestamp_at(timestamp_ms, max_diff_ms, now_ms())
}

fn validate_timestamp_at(timestamp_ms: i64, max_diff_ms: i64, now: i64) -> bool {
    if max_diff_ms < 0 {
        return false;
    }
    // abs_diff, not subtraction: the timestamp is attacker-supplied and may
    // sit at either end of the i64 range, where `now - timestamp` overflows.
    now.abs_diff(timestamp_ms) <= max_diff_ms as u64
}

/// Build the canonical query string from key/value pairs.
///
/// Keys are sorted lexicographically; pairs sharing a key keep their input
/// order (array parameters expand to repeated `key=value` pairs in array
/// order, not further sorted). Keys and values are percent-encoded. An empty
/// slice yields an empty string.
///
/// # Examples
///
/// ```
/// use keygate::auth::canonical::build_query_string;
///
/// assert_eq!(build_query_string(&[("b", "2"), ("a", "1")]), "a=1&b=2");
/// assert_eq!(build_query_string(&[]), "");
/// ```
#[must_use]
pub fn build_query_string(pairs: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(&str, &str)> = pairs.to_vec();
    // Stable sort: repeated keys keep their relative (array) order.
    pairs.sort_by_key(|(k, _)| *k);
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, QUERY_ENCODE_SET),
                utf8_percent_encode(v, QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonicalize the raw query string of a live request.
///
/// Each pair is percent-decoded and re-encoded with [`QUERY_ENCODE_SET`] so
/// that clients with slightly different encoders still produce the canonical
/// form, then sorted the same way [`build_query_string`] sorts.
#[must_use]
pub fn canonicalize_raw_query(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let decoded: Vec<(String, String)> = raw
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode_str(k).decode_utf8_lossy().into_owned(),
                percent_decode_str(v).decode_utf8_lossy().into_owned(),
            )
        })
        .collect();

    let pairs: Vec<(&str, &str)> = decoded
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    build_query_string(&pairs)
}

/// Serialize a JSON body into its canonical signing form.
///
/// Returns `None` for `null` and for objects with no keys — an absent body
/// contributes an empty string to the string to sign, not a hash of `{}`.
/// Objects are re-serialized with **top-level** keys sorted lexicographically;
/// nested objects are left exactly as given. Callers that transmit the body
/// must send these exact bytes, since the verifier hashes what arrives on the
/// wire byte-for-byte.
#[must_use]
pub fn canonical_json_body(body: &Value) -> Option<String> {
    match body {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            let mut sorted = serde_json::Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), v.clone());
            }
            Some(Value::Object(sorted).to_string())
        }
        other => Some(other.to_string()),
    }
}

/// Base64 SHA-256 of raw body bytes; empty body hashes to the empty string.
///
/// A string body is hashed byte-for-byte with no re-serialization. JSON
/// passed as a string with unsorted keys therefore hashes differently than
/// the same content passed through [`canonical_json_body`] — signers must be
/// consistent about which form they use.
#[must_use]
pub fn hash_body_bytes(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    BASE64.encode(Sha256::digest(body))
}

/// Canonicalize and hash a JSON body in one step.
#[must_use]
pub fn hash_body_json(body: &Value) -> String {
    canonical_json_body(body)
        .map(|s| hash_body_bytes(s.as_bytes()))
        .unwrap_or_default()
}

/// Join the six canonical components with `\n`. The method is uppercased;
/// every other component is included verbatim.
#[must_use]
pub fn string_to_sign(
    method: &str,
    path: &str,
    query_string: &str,
    body_hash: &str,
    timestamp_ms: i64,
    nonce: &str,
) -> String {
    format!(
        "{}\n{path}\n{query_string}\n{body_hash}\n{timestamp_ms}\n{nonce}",
        method.to_uppercase()
    )
}
