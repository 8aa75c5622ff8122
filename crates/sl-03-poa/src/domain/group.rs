use crate::domain::entry::PoaEntry;
use crate::domain::rules::{check_poa_transaction_permissions, consume_poa_grant, PoaRequest};
use shared_types::{Address, AssetId, Balance, BalanceError, Checked, Outcome, Timestamp, TxType};
use sl_01_state_store::KeyedStore;
use std::collections::BTreeMap;

/// POA draws of one transaction, aggregated per `(grantor, reference)` and
/// asset.
///
/// Each asset is checked once with its combined amount, so a grant is never
/// validated against less than will be taken from it.
#[derive(Debug, Clone, Default)]
pub struct PoaCheckGroup {
    groups: BTreeMap<(Address, String), BTreeMap<AssetId, Balance>>,
}

impl PoaCheckGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        address: &str,
        reference: &str,
        asset_id: &str,
        amount: Balance,
    ) -> Result<(), BalanceError> {
        let slot = self
            .groups
            .entry((address.to_string(), reference.to_string()))
            .or_default()
            .entry(asset_id.to_string())
            .or_insert(Balance::ZERO);
        *slot = slot.checked_add(amount)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Aggregate amount recorded for one draw.
    pub fn amount(&self, address: &str, reference: &str, asset_id: &str) -> Option<Balance> {
        self.groups
            .get(&(address.to_string(), reference.to_string()))
            .and_then(|assets| assets.get(asset_id))
            .copied()
    }

    /// Check every aggregated draw and consume it straight away.
    ///
    /// Consumption is real, so callers run this inside a provisional layer
    /// and discard it if anything later rejects the transaction.
    pub fn check_and_consume<S>(
        &self,
        store: &mut S,
        now: Timestamp,
        attorney: &str,
        tx_type: TxType,
    ) -> Checked<()>
    where
        S: KeyedStore<PoaEntry> + ?Sized,
    {
        for ((address, reference), assets) in &self.groups {
            for (asset_id, amount) in assets {
                let asset_ids = [asset_id.as_str()];
                let request = PoaRequest {
                    poa_address: address,
                    reference,
                    attorney,
                    tx_type,
                    assets: &asset_ids,
                    amount: *amount,
                };
                let grant = check_poa_transaction_permissions(store, now, &request, false)?;
                consume_poa_grant(store, &grant, *amount, now)
                    .map_err(|err| Outcome::fail(err.to_string()))?;
            }
        }
        Ok(())
    }
}
