//! Messages covered by the signatures inside contracts and commitments.
//!
//! Party and cancel signatures cover the bare contract address. Structured
//! items are hashed first: their fields are joined with `|` and passed
//! through the injected [`MessageHasher`].

use crate::domain::commit::AssetIn;
use crate::domain::dvp::{DvpAmount, DvpPayItem};
use crate::domain::exchange::NominateAsset;
use shared_types::{Address, MessageHasher};

fn hash_fields(hasher: &dyn MessageHasher, fields: &[&str]) -> String {
    hasher.compute_hash(fields.join("|").as_bytes())
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// `"{id}_{refused}"`, prefixed with the contract address when the
/// authorisation is bound to one contract.
pub fn authorisation_message(contract: &str, id: &str, refused: bool, contract_specific: bool) -> String {
    if contract_specific {
        format!("{contract}{id}_{}", flag(refused))
    } else {
        format!("{id}_{}", flag(refused))
    }
}

/// Parameter name followed by its value, prefixed with the contract address
/// when contract specific.
pub fn parameter_message(contract: &str, name: &str, value: &str, contract_specific: bool) -> String {
    if contract_specific {
        format!("{contract}{name}{value}")
    } else {
        format!("{name}{value}")
    }
}

pub fn pay_item_message(hasher: &dyn MessageHasher, contract: &str, item: &DvpPayItem) -> String {
    let amount = item.amount.to_string();
    hash_fields(hasher, &[contract, &item.namespace, &item.class_id, &amount])
}

pub fn add_encumbrance_message(
    hasher: &dyn MessageHasher,
    contract: &str,
    asset_id: &str,
    reference: &str,
    amount: &DvpAmount,
) -> String {
    let amount = amount.to_string();
    hash_fields(hasher, &[contract, asset_id, reference, &amount])
}

pub fn nominate_asset_message(hasher: &dyn MessageHasher, contract: &str, leg: &NominateAsset) -> String {
    let asset_id = leg.asset_id();
    hash_fields(hasher, &[contract, &leg.address, &asset_id, &leg.reference])
}

/// Not hashed: `"{contract}|{address}|{amount}|{author}|{nonce}"`.
pub fn asset_in_message(contract: &str, asset_in: &AssetIn, authoring_address: &Address, nonce: u64) -> String {
    format!(
        "{contract}|{}|{}|{authoring_address}|{nonce}",
        asset_in.address, asset_in.amount
    )
}
