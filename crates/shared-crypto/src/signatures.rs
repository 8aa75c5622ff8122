//! # Ed25519 Signatures
//!
//! Twisted Edwards curve signatures with deterministic nonces. Keys and
//! signatures cross the engine boundary as lowercase hex strings.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], CryptoError> {
    let bytes = hex::decode(text).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        expected: N,
        actual,
    })
}

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        // Validate it's a valid point
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(decode_fixed::<32>(text)?)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from 128 hex characters.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        decode_fixed::<64>(text).map(Self)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        Ed25519PublicKey(verifying_key.to_bytes())
    }

    /// Hex-encoded public key, as used in ledger transactions.
    pub fn public_key_hex(&self) -> String {
        self.public_key().to_hex()
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Sign a textual message and return the hex signature.
    pub fn sign_hex(&self, message: &str) -> String {
        self.sign(message.as_bytes()).to_hex()
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}
