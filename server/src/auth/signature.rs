//! HMAC-SHA256 signature computation and constant-time verification.
//!
//! Two encodings exist for historical reasons. The canonical `HMAC-SHA256`
//! (and `Bearer`) scheme carries **base64** signatures; the legacy `Admin`
//! scheme carries **hex**. The two are mutually incompatible — a base64
//! signer against a hex verifier fails every request — so each gate picks
//! exactly one encoding and never mixes them.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn mac_bytes(secret: &str, string_to_sign: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// HMAC-SHA256 over the string to sign, base64-encoded (canonical variant).
#[must_use]
pub fn sign(secret: &str, string_to_sign: &str) -> String {
    BASE64.encode(mac_bytes(secret, string_to_sign))
}

/// HMAC-SHA256 over the string to sign, hex-encoded (legacy `Admin` variant).
#[must_use]
pub fn sign_hex(secret: &str, string_to_sign: &str) -> String {
    hex::encode(mac_bytes(secret, string_to_sign))
}

/// Compare a provided signature against the expected one.
///
/// Length is checked first and short-circuits to `false` outside the
/// constant-time path; only the signature length can leak, never where the
/// contents first differ. Equal-length inputs go through
/// [`subtle::ConstantTimeEq`].
#[must_use]
pub fn verify(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::canonical::string_to_sign;

    #[test]
    fn test_signing_is_deterministic() {
        let sts = string_to_sign("POST", "/graphql", "a=1", "HASH", 1234, "nonce");
        assert_eq!(sign("s1", &sts), sign("s1", &sts));
        assert_eq!(sign_hex("s1", &sts), sign_hex("s1", &sts));
    }

    #[test]
    fn test_round_trip_verifies() {
        let sts = string_to_sign("POST", "/graphql", "", "", 1234, "nonce");
        let sig = sign("shared-secret", &sts);
        assert!(verify(&sig, &sign("shared-secret", &sts)));
    }

    #[test]
    fn test_tamper_sensitivity() {
        let secret = "shared-secret";
        let sig = sign(
            secret,
            &string_to_sign("POST", "/graphql", "a=1", "HASH", 1234, "nonce"),
        );

        let tampered = [
            string_to_sign("GET", "/graphql", "a=1", "HASH", 1234, "nonce"),
            string_to_sign("POST", "/graphq", "a=1", "HASH", 1234, "nonce"),
            string_to_sign("POST", "/graphql", "a=2", "HASH", 1234, "nonce"),
            string_to_sign("POST", "/graphql", "a=1", "HASg", 1234, "nonce"),
            string_to_sign("POST", "/graphql", "a=1", "HASH", 1235, "nonce"),
            string_to_sign("POST", "/graphql", "a=1", "HASH", 1234, "nonce2"),
        ];
        for sts in tampered {
            assert!(!verify(&sig, &sign(secret, &sts)), "accepted: {sts:?}");
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let sts = string_to_sign("POST", "/graphql", "", "", 1234, "nonce");
        assert!(!verify(&sign("s1", &sts), &sign("s2", &sts)));
    }

    #[test]
    fn test_length_mismatch_rejected_without_panic() {
        let sts = string_to_sign("POST", "/graphql", "", "", 1234, "nonce");
        let expected = sign("s1", &sts);
        assert!(!verify("short", &expected));
        assert!(!verify("", &expected));
        // hex signature against a base64 expectation: wrong length, wrong bytes
        assert!(!verify(&sign_hex("s1", &sts), &expected));
    }

    #[test]
    fn test_encodings_differ() {
        let sts = string_to_sign("POST", "/graphql", "", "", 1234, "nonce");
        assert_ne!(sign("s1", &sts), sign_hex("s1", &sts));
        // hex digest of SHA-256 output is always 64 chars
        assert_eq!(sign_hex("s1", &sts).len(), 64);
    }
}
