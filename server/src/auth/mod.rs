//! HMAC-SHA256 request authentication.
//!
//! The protocol shared by the signing client and the verifying gates: every
//! request carries an `Authorization` header with an API key, a millisecond
//! timestamp, a random nonce, and an HMAC-SHA256 signature over a canonical
//! serialization of the request. See [`canonical`] for the exact byte layout
//! and [`middleware`] for the request gates.

pub mod canonical;
pub mod error;
pub mod header;
pub mod middleware;
pub mod registry;
pub mod signature;

pub use error::AuthError;
pub use header::Credentials;
pub use middleware::{AuthContext, DEV_BYPASS_IDENTITY};
pub use registry::{ApiKeyRecord, ApiKeyRegistry, RedactedApiKey};
