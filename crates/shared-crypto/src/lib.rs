//! # Shared Crypto - Reference Collaborators
//!
//! Concrete implementations of the collaborator traits the settlement engine
//! consumes ([`shared_types::SignatureVerifier`] and
//! [`shared_types::MessageHasher`]).
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Key pairs, signing, verification |
//! | `hashing` | SHA-256 | Message digests for signed payloads |
//! | `verifier` | Ed25519 + SHA-256 | Address derivation and `SignatureVerifier` |
//!
//! ## Encodings
//!
//! - Public keys: 64 lowercase hex characters.
//! - Signatures: 128 lowercase hex characters.
//! - Addresses: 40 lowercase hex characters, the first 20 bytes of
//!   `SHA-256(public key)` (contract addresses also hash the author nonce).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;
pub mod verifier;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256_hash, sha256_hex, Sha256Hasher};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use verifier::{contract_address, normal_address, Ed25519Verifier};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
