//! Opaque session tokens.
//!
//! Clients hold the random token; the database only stores its SHA-256 digest.

use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Length of a freshly issued token.
pub const TOKEN_LEN: usize = 48;

/// Generates a random alphanumeric token.
#[must_use]
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 digest of `token`, as stored in `sessions`.
///
/// ```
/// use bankline_core::auth::hash_token;
///
/// assert_eq!(hash_token("abc").len(), 64);
/// ```
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
