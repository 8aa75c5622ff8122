//! # Tokens Nominate Contract Payload
//!
//! The issuer swaps whole blocks of an input class for whole blocks of an
//! output class in the same namespace.

use serde::{Deserialize, Serialize};
use shared_types::{full_asset_id, AssetId, Balance, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensNominateContract {
    pub namespace: String,
    pub input_class: String,
    pub output_class: String,
    pub block_size_in: Balance,
    pub block_size_out: Balance,
    pub expiry: Timestamp,
    pub protocol: String,
    pub metadata: String,
}

impl TokensNominateContract {
    pub fn input_asset_id(&self) -> AssetId {
        full_asset_id(&self.namespace, &self.input_class)
    }

    pub fn output_asset_id(&self) -> AssetId {
        full_asset_id(&self.namespace, &self.output_class)
    }

    pub fn has_expired(&self, now: Timestamp) -> bool {
        self.expiry < now
    }
}
