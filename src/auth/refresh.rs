//! Refresh token hashing.
//!
//! The raw refresh token (a signed envelope from [`TokenCodec`]) is handed to
//! the client exactly once. The store only ever sees its SHA-256 digest,
//! hex-encoded, and every lookup goes through that digest:
//! - a full store dump doesn't reveal usable tokens
//! - presenting a token means hashing it and looking up the hash
//!
//! External stores must use the same encoding: one SHA-256 round over the
//! UTF-8 bytes of the raw token, lowercase hex.
//!
//! [`TokenCodec`]: crate::auth::jwt::TokenCodec

use sha2::{Digest, Sha256};

/// Hash a raw token with SHA-256 and return the hex digest.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// Tests
// ============================================================================
