//! Salted SHA-256 password digests

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub use authgate_shared::OAUTH_ONLY_MARKER;

/// Bytes of entropy in a generated salt
pub const SALT_LEN: usize = 16;

/// Generate a per-account salt: 16 bytes from the OS CSPRNG, base64-encoded
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Lowercase hex SHA-256 of `salt ++ password`.
/// Deterministic: the same inputs always give the same digest.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the digest for `password` and compare it with `expected`.
///
/// Stored digests may be upper- or lowercase hex, so `expected` is
/// lowercased first. The comparison itself is constant-time.
pub fn verify_password(password: &str, salt: &str, expected: &str) -> bool {
    let computed = hash_password(password, salt);
    let expected = expected.to_ascii_lowercase();

    if computed.len() != expected.len() {
        return false;
    }
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Fresh salt and digest pair for a new or changed password
pub fn new_credential(password: &str) -> (String, String) {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    (hash, salt)
}
