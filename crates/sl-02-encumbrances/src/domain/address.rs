use crate::domain::asset::AssetEncumbrances;
use crate::domain::entry::{AddMode, EncumbranceEntry, Priority};
use serde::{Deserialize, Serialize};
use shared_types::{Address, AssetId, Balance, BalanceError};
use sl_01_state_store::StateEntry;
use std::collections::BTreeMap;

/// Every encumbrance held against one address, keyed by full asset id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEncumbrances {
    address: Address,
    assets: BTreeMap<AssetId, AssetEncumbrances>,
    update_height: i64,
}

impl AddressEncumbrances {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            assets: BTreeMap::new(),
            update_height: -1,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn update_height(&self) -> i64 {
        self.update_height
    }

    /// Record the block height of the latest change; never moves backwards.
    pub fn set_update_height(&mut self, height: i64) {
        self.update_height = self.update_height.max(height);
    }

    /// Add an entry against `asset_id`. The per-asset collection is only
    /// created for a positive amount.
    pub fn set_encumbrance_entry(
        &mut self,
        asset_id: &str,
        entry: EncumbranceEntry,
        priority: Priority,
        mode: AddMode,
    ) -> Result<bool, BalanceError> {
        if let Some(assets) = self.assets.get_mut(asset_id) {
            return assets.add_encumbrance(entry, priority, mode);
        }
        if !entry.amount.is_positive() {
            return Ok(false);
        }
        let mut assets = AssetEncumbrances::new();
        let added = assets.add_encumbrance(entry, priority, mode)?;
        if added {
            self.assets.insert(asset_id.to_string(), assets);
        }
        Ok(added)
    }

    pub fn asset_encumbrance(&self, asset_id: &str) -> Option<&AssetEncumbrances> {
        self.assets.get(asset_id)
    }

    pub fn asset_encumbrance_mut(&mut self, asset_id: &str) -> Option<&mut AssetEncumbrances> {
        self.assets.get_mut(asset_id)
    }

    pub fn remove_asset_encumbrance(&mut self, asset_id: &str) -> Option<AssetEncumbrances> {
        self.assets.remove(asset_id)
    }

    pub fn assets(&self) -> impl Iterator<Item = (&AssetId, &AssetEncumbrances)> + '_ {
        self.assets.iter()
    }

    /// Cached total for one asset, zero when nothing is held against it.
    pub fn encumbrance_total(&self, asset_id: &str) -> Balance {
        self.assets
            .get(asset_id)
            .map(AssetEncumbrances::total)
            .unwrap_or(Balance::ZERO)
    }

    pub fn aggregate_by_reference(
        &self,
        asset_id: &str,
        reference: &str,
    ) -> Result<Option<EncumbranceEntry>, BalanceError> {
        match self.assets.get(asset_id) {
            Some(assets) => assets.aggregate_by_reference(reference),
            None => Ok(None),
        }
    }

    pub fn aggregate_available_by_reference(
        &self,
        asset_id: &str,
        reference: &str,
        holding: Balance,
    ) -> Result<Option<EncumbranceEntry>, BalanceError> {
        match self.assets.get(asset_id) {
            Some(assets) => assets.aggregate_available_by_reference(reference, holding),
            None => Ok(None),
        }
    }

    /// Drop asset collections with nothing left in them.
    pub fn tidy(&mut self) {
        self.assets.retain(|_, assets| !assets.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.assets.values().all(AssetEncumbrances::is_empty)
    }
}

impl StateEntry for AddressEncumbrances {
    fn key(&self) -> &str {
        &self.address
    }
}
