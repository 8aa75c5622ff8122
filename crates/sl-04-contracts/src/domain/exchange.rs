//! # Exchange Contract Payload
//!
//! A standing offer: whoever commits whole blocks of every input asset
//! receives the same number of blocks of every output asset.

use serde::{Deserialize, Serialize};
use shared_types::{full_asset_id, Address, AssetId, Balance, PublicKey, Signature, Timestamp};

/// One asset leg of an exchange or of a commitment to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominateAsset {
    pub namespace: String,
    pub class_id: String,
    /// Amount committed. Unused in contract legs.
    pub amount: Balance,
    /// Size of one block. Unused in commitment legs.
    pub block_size: Balance,
    /// Address the leg is bound to; empty means the issuer (contract
    /// legs) or the committer (commitment legs).
    pub address: Address,
    /// POA reference under which the leg is drawn.
    pub reference: String,
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl NominateAsset {
    pub fn new(namespace: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            class_id: class_id.into(),
            ..Default::default()
        }
    }

    pub fn with_block_size(mut self, block_size: i128) -> Self {
        self.block_size = Balance::new(block_size);
        self
    }

    pub fn with_amount(mut self, amount: i128) -> Self {
        self.amount = Balance::new(amount);
        self
    }

    pub fn with_address(mut self, address: impl Into<Address>) -> Self {
        self.address = address.into();
        self
    }

    pub fn asset_id(&self) -> AssetId {
        full_asset_id(&self.namespace, &self.class_id)
    }

    pub fn is_signed(&self) -> bool {
        !self.public_key.is_empty() && !self.signature.is_empty()
    }
}

/// Family payload of an exchange contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeContract {
    pub inputs: Vec<NominateAsset>,
    pub outputs: Vec<NominateAsset>,
    pub min_blocks: Balance,
    /// Zero means unbounded.
    pub max_blocks: Balance,
    pub start_date: Timestamp,
    pub expiry: Timestamp,
    pub protocol: String,
    pub metadata: String,
}

impl ExchangeContract {
    pub fn has_started(&self, now: Timestamp) -> bool {
        self.start_date <= now
    }

    pub fn has_expired(&self, now: Timestamp) -> bool {
        self.expiry < now
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .filter(|leg| !leg.address.is_empty())
            .map(|leg| leg.address.clone())
            .collect()
    }
}
