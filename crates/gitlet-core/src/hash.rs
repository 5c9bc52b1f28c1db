//! Content hashing using SHA-256.

use sha2::{Digest, Sha256};

/// Length of a full object id in hex characters.
pub const ID_LEN: usize = 64;

/// Compute the SHA-256 hash of arbitrary bytes, returned as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compute the SHA-256 hash of a string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// True if `s` could be a full object id.
pub fn is_full_id(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
