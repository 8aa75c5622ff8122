//! Address balances, namespaces and asset locks.

use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, Balance, BalanceError, TxType};
use sl_01_state_store::StateEntry;
use std::collections::{BTreeMap, BTreeSet};

/// Balances and permissions of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub address: Address,
    pub nonce: u64,
    balances: BTreeMap<AssetId, Balance>,
    pub permissions: u64,
    pub authorised_tx: BTreeSet<TxType>,
    pub update_height: i64,
}

impl AddressEntry {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            nonce: 0,
            balances: BTreeMap::new(),
            permissions: 0,
            authorised_tx: BTreeSet::new(),
            update_height: -1,
        }
    }

    pub fn with_balance(mut self, asset_id: &str, amount: Balance) -> Self {
        self.set_balance(asset_id, amount);
        self
    }

    pub fn with_permissions(mut self, permissions: u64) -> Self {
        self.permissions = permissions;
        self
    }

    /// Balance of `asset_id`, zero when never held.
    pub fn balance(&self, asset_id: &str) -> Balance {
        self.balances.get(asset_id).copied().unwrap_or(Balance::ZERO)
    }

    pub fn set_balance(&mut self, asset_id: &str, amount: Balance) {
        self.balances.insert(asset_id.to_string(), amount);
    }

    /// Add `delta` (possibly negative) to the balance of `asset_id`.
    pub fn adjust_balance(&mut self, asset_id: &str, delta: Balance) -> Result<Balance, BalanceError> {
        let updated = self.balance(asset_id).checked_add(delta)?;
        self.set_balance(asset_id, updated);
        Ok(updated)
    }

    pub fn balances(&self) -> impl Iterator<Item = (&AssetId, &Balance)> + '_ {
        self.balances.iter()
    }

    pub fn can_use_tx(&self, tx_type: TxType) -> bool {
        self.authorised_tx.contains(&tx_type)
    }
}

impl StateEntry for AddressEntry {
    fn key(&self) -> &str {
        &self.address
    }
}

/// A namespace and the classes registered in it. The owner issues every
/// class of the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub namespace: String,
    pub owner: Address,
    classes: BTreeSet<String>,
}

impl NamespaceEntry {
    pub fn new<I, S>(namespace: impl Into<String>, owner: impl Into<Address>, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            owner: owner.into(),
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains_asset(&self, class_id: &str) -> bool {
        self.classes.contains(class_id)
    }

    pub fn register_class(&mut self, class_id: impl Into<String>) -> bool {
        self.classes.insert(class_id.into())
    }
}

impl StateEntry for NamespaceEntry {
    fn key(&self) -> &str {
        &self.namespace
    }
}

/// A lock on a whole namespace or on one full asset id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAsset {
    pub id: String,
}

impl LockedAsset {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl StateEntry for LockedAsset {
    fn key(&self) -> &str {
        &self.id
    }
}
