//! Shared fixtures: keyed actors, a service wired with the reference
//! collaborators, and helpers to seed snapshots.

use shared_crypto::{contract_address, normal_address, Ed25519KeyPair, Ed25519Verifier, Sha256Hasher};
use shared_types::{Balance, Timestamp};
use sl_04_contracts::adapters::SimpleMathEvaluator;
use sl_04_contracts::domain::{AddressEntry, NamespaceEntry, TxEnvelope};
use sl_04_contracts::{ServiceConfig, SettlementService, StateSnapshot};

/// Chain every fixture transaction is addressed to.
pub const CHAIN_ID: u32 = 1;

/// Wall-clock time the flows run at.
pub const NOW: Timestamp = 1_700_000_000;

/// A key holder taking part in a flow.
pub struct Actor {
    keypair: Ed25519KeyPair,
    pub address: String,
    pub public_key: String,
}

impl Actor {
    /// Deterministic actor; distinct seeds give distinct addresses.
    pub fn from_seed(seed: u8) -> Self {
        Self::with_keypair(Ed25519KeyPair::from_seed([seed; 32]))
    }

    pub fn random() -> Self {
        Self::with_keypair(Ed25519KeyPair::generate())
    }

    fn with_keypair(keypair: Ed25519KeyPair) -> Self {
        let address = normal_address(&keypair.public_key());
        let public_key = keypair.public_key_hex();
        Self {
            keypair,
            address,
            public_key,
        }
    }

    /// Hex signature over `message`.
    pub fn sign(&self, message: &str) -> String {
        self.keypair.sign_hex(message)
    }

    /// Address of the contract this actor creates with `nonce`.
    pub fn contract_address(&self, nonce: u64) -> String {
        contract_address(&self.keypair.public_key(), nonce)
    }

    /// Envelope of a transaction authored by this actor at [`NOW`].
    pub fn envelope(&self, hash: &str, nonce: u64) -> TxEnvelope {
        TxEnvelope::new(hash, CHAIN_ID, NOW, self.address.clone(), self.public_key.clone()).with_nonce(nonce)
    }
}

/// Service wired with Ed25519 signatures, SHA-256 digests and the simple
/// formula evaluator.
pub fn service() -> SettlementService {
    service_with(ServiceConfig::default())
}

pub fn service_with(config: ServiceConfig) -> SettlementService {
    SettlementService::new(
        config,
        Box::new(Ed25519Verifier::new()),
        Box::new(Sha256Hasher),
        Box::new(SimpleMathEvaluator::new()),
    )
}

/// Set the holding of `asset_id` at `address`, creating the address entry
/// if needed.
pub fn fund(snapshot: &mut StateSnapshot, address: &str, asset_id: &str, amount: i128) {
    match snapshot.balances.find_and_mark_updated(address) {
        Some(entry) => entry.set_balance(asset_id, Balance::new(amount)),
        None => {
            snapshot
                .balances
                .add(AddressEntry::new(address).with_balance(asset_id, Balance::new(amount)));
        }
    }
}

/// Holding of `asset_id` at `address`, zero when absent.
pub fn holding(snapshot: &StateSnapshot, address: &str, asset_id: &str) -> i128 {
    snapshot
        .balances
        .find(address)
        .map(|entry| entry.balance(asset_id).value())
        .unwrap_or(0)
}

/// Register `namespace` with `classes`, owned by `owner`.
pub fn register_namespace(snapshot: &mut StateSnapshot, namespace: &str, owner: &str, classes: &[&str]) {
    snapshot
        .namespaces
        .add(NamespaceEntry::new(namespace, owner, classes.iter().copied()));
}
