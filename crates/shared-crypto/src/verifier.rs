//! # Ed25519 Verifier
//!
//! [`SignatureVerifier`] implementation used by tests and reference
//! deployments of the settlement engine.

use crate::hashing::sha256_hash_many;
use crate::signatures::{Ed25519PublicKey, Ed25519Signature};
use shared_types::{Address, AddressType, SignatureVerifier};

/// Length of an address in bytes.
pub const ADDRESS_BYTES: usize = 20;

const CONTRACT_DOMAIN: &[u8] = b"contract";

fn is_lower_hex(text: &str, len: usize) -> bool {
    text.len() == len && text.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Address of a key holder.
pub fn normal_address(public_key: &Ed25519PublicKey) -> Address {
    let digest = sha256_hash_many(&[public_key.as_bytes().as_slice()]);
    hex::encode(&digest[..ADDRESS_BYTES])
}

/// Address of a contract created by `public_key` with author nonce `nonce`.
pub fn contract_address(public_key: &Ed25519PublicKey, nonce: u64) -> Address {
    let digest = sha256_hash_many(&[
        CONTRACT_DOMAIN,
        public_key.as_bytes().as_slice(),
        nonce.to_be_bytes().as_slice(),
    ]);
    hex::encode(&digest[..ADDRESS_BYTES])
}

/// Ed25519 / SHA-256 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    /// Create a verifier.
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify_address(&self, address: &str) -> bool {
        is_lower_hex(address, ADDRESS_BYTES * 2)
    }

    fn verify_public_key(&self, public_key: &str) -> bool {
        Ed25519PublicKey::from_hex(public_key).is_ok()
    }

    fn verify(&self, address: &str, public_key: &str, address_type: AddressType) -> bool {
        if address_type != AddressType::Normal {
            return false;
        }
        match Ed25519PublicKey::from_hex(public_key) {
            Ok(key) => normal_address(&key) == address,
            Err(_) => false,
        }
    }

    fn verify_signature(&self, message: &str, public_key: &str, signature: &str) -> bool {
        let Ok(key) = Ed25519PublicKey::from_hex(public_key) else {
            return false;
        };
        let Ok(sig) = Ed25519Signature::from_hex(signature) else {
            return false;
        };
        key.verify(message.as_bytes(), &sig).is_ok()
    }

    fn public_key_to_address(
        &self,
        public_key: &str,
        address_type: AddressType,
        nonce: Option<u64>,
    ) -> Option<Address> {
        let key = Ed25519PublicKey::from_hex(public_key).ok()?;
        match address_type {
            AddressType::Normal => Some(normal_address(&key)),
            AddressType::Contract => Some(contract_address(&key, nonce.unwrap_or(0))),
        }
    }
}
