//! # Security Collaborators
//!
//! The settlement engine never implements signature schemes or address
//! derivation itself. It consumes these traits, injected by the caller.

use crate::entities::{Address, AddressType};

/// Address and signature verification.
pub trait SignatureVerifier: Send + Sync {
    /// Is `address` a well-formed ledger address?
    fn verify_address(&self, address: &str) -> bool;

    /// Is `public_key` a well-formed public key?
    fn verify_public_key(&self, public_key: &str) -> bool;

    /// Does `address` derive from `public_key`?
    fn verify(&self, address: &str, public_key: &str, address_type: AddressType) -> bool;

    /// Is `signature` a valid signature of `message` under `public_key`?
    fn verify_signature(&self, message: &str, public_key: &str, signature: &str) -> bool;

    /// Derive an address from a public key. Contract addresses also take the
    /// author's nonce.
    fn public_key_to_address(
        &self,
        public_key: &str,
        address_type: AddressType,
        nonce: Option<u64>,
    ) -> Option<Address>;

    /// `true` when `value` is either a valid public key or a valid address.
    fn verify_key_or_address(&self, value: &str) -> bool {
        self.verify_public_key(value) || self.verify_address(value)
    }
}

/// Hash function used to build signed messages.
pub trait MessageHasher: Send + Sync {
    /// Hex-encoded digest of `data`.
    fn compute_hash(&self, data: &[u8]) -> String;
}
