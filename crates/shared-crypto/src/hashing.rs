//! # SHA-256 Hashing
//!
//! Digest used for signed-message construction and address derivation.

use sha2::{Digest, Sha256};
use shared_types::MessageHasher;

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with SHA-256 (one-shot).
pub fn sha256_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple inputs as one stream.
pub fn sha256_hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_hash(data))
}

/// [`MessageHasher`] backed by SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl MessageHasher for Sha256Hasher {
    fn compute_hash(&self, data: &[u8]) -> String {
        sha256_hex(data)
    }
}
