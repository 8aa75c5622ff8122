//! # Ledger Snapshot
//!
//! The composite state every contract operation runs against: one
//! [`VersionedCollection`] per entity kind, a buffered event log and the
//! corruption flag, all moved through layers together.
//!
//! ```text
//! StateSnapshot
//! ├── contracts     ContractEntry        (key: contract address)
//! ├── balances      AddressEntry         (key: address)
//! ├── namespaces    NamespaceEntry       (key: namespace)
//! ├── encumbrances  AddressEncumbrances  (key: address)
//! ├── poas          PoaEntry             (key: address | address|reference)
//! ├── locked        LockedAsset          (key: namespace or asset id)
//! ├── events        VersionedLog<LedgerEvent>
//! └── status        SnapshotStatus
//! ```

use crate::domain::config::StateConfig;
use crate::domain::contract::{ContractEntry, ContractFamily};
use crate::domain::entries::{AddressEntry, LockedAsset, NamespaceEntry};
use crate::domain::events::{LedgerEvent, LifeCycleKind};
use shared_types::{Address, Timestamp, TxType};
use sl_01_state_store::{Layered, SnapshotStatus, StoreError, VersionedCollection, VersionedLog};
use sl_02_encumbrances::AddressEncumbrances;
use sl_03_poa::{PermissionLookup, PoaEntry};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct StateSnapshot {
    config: StateConfig,
    height: i64,
    pub contracts: VersionedCollection<ContractEntry>,
    pub balances: VersionedCollection<AddressEntry>,
    pub namespaces: VersionedCollection<NamespaceEntry>,
    pub encumbrances: VersionedCollection<AddressEncumbrances>,
    pub poas: VersionedCollection<PoaEntry>,
    pub locked: VersionedCollection<LockedAsset>,
    pub events: VersionedLog<LedgerEvent>,
    status: SnapshotStatus,
}

impl StateSnapshot {
    pub fn new(config: StateConfig) -> Self {
        Self {
            config,
            height: 0,
            contracts: VersionedCollection::new("contracts"),
            balances: VersionedCollection::new("balances"),
            namespaces: VersionedCollection::new("namespaces"),
            encumbrances: VersionedCollection::new("encumbrances"),
            poas: VersionedCollection::new("poas"),
            locked: VersionedCollection::new("locked"),
            events: VersionedLog::new("events"),
            status: SnapshotStatus::new(),
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn set_height(&mut self, height: i64) {
        self.height = height;
    }

    // === Corruption ===

    pub fn set_corrupted(&mut self, cause: impl Into<String>) {
        self.status.set_corrupted(cause);
    }

    pub fn is_corrupted(&self) -> bool {
        self.status.is_corrupted()
    }

    pub fn corruption_cause(&self) -> Option<&str> {
        self.status.corruption_cause()
    }

    // === Locks ===

    /// Is `id` (a namespace or a full asset id) locked?
    pub fn is_asset_locked(&self, id: &str) -> bool {
        self.locked.item_exists(id)
    }

    pub fn lock_asset(&mut self, id: impl Into<String>) -> bool {
        self.locked.add(LockedAsset::new(id))
    }

    pub fn unlock_asset(&mut self, id: &str) -> bool {
        self.locked.delete(id)
    }

    // === Events ===

    pub fn add_contract_event(&mut self, address: &str, function: ContractFamily, phase: &str, detail: &str) {
        self.events.push(LedgerEvent::Contract {
            address: address.to_string(),
            function,
            phase: phase.to_string(),
            detail: detail.to_string(),
        });
    }

    pub fn add_life_cycle_event(&mut self, kind: LifeCycleKind, address: &str, participants: BTreeSet<Address>) {
        self.events.push(LedgerEvent::LifeCycle {
            kind,
            address: address.to_string(),
            participants,
        });
    }

    pub fn add_event_time(&mut self, address: &str, at: Timestamp) {
        self.events.push(LedgerEvent::AddEventTime {
            address: address.to_string(),
            at,
        });
    }

    pub fn remove_event_time(&mut self, address: &str, at: Timestamp) {
        self.events.push(LedgerEvent::RemoveEventTime {
            address: address.to_string(),
            at,
        });
    }

    /// Incomplete contracts whose scheduled time is at or before `now`,
    /// earliest first.
    pub fn due_contracts(&self, now: Timestamp) -> Vec<(Timestamp, Address)> {
        let mut due: Vec<(Timestamp, Address)> = self
            .contracts
            .iter()
            .filter(|entry| !entry.is_completed())
            .filter_map(|entry| {
                entry
                    .header
                    .next_time_event
                    .filter(|at| *at <= now)
                    .map(|at| (at, entry.header.address.clone()))
            })
            .collect();
        due.sort();
        due
    }

    fn check_depths(&self) -> Result<(), StoreError> {
        let expected = self.contracts.depth();
        let parts: [(&'static str, usize); 8] = [
            ("balances", self.balances.depth()),
            ("namespaces", self.namespaces.depth()),
            ("encumbrances", self.encumbrances.depth()),
            ("poas", self.poas.depth()),
            ("locked", self.locked.depth()),
            ("events", self.events.depth()),
            ("status", self.status.depth()),
            ("contracts", expected),
        ];
        for (collection, found) in parts {
            if found != expected {
                return Err(StoreError::DepthMismatch {
                    collection,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

impl Layered for StateSnapshot {
    fn create_snapshot(&mut self) {
        self.contracts.create_snapshot();
        self.balances.create_snapshot();
        self.namespaces.create_snapshot();
        self.encumbrances.create_snapshot();
        self.poas.create_snapshot();
        self.locked.create_snapshot();
        self.events.create_snapshot();
        self.status.create_snapshot();
    }

    /// Refuses a corrupted layer before touching any collection.
    fn commit(&mut self) -> Result<(), StoreError> {
        self.check_depths()?;
        self.status.commit()?;
        self.contracts.commit()?;
        self.balances.commit()?;
        self.namespaces.commit()?;
        self.encumbrances.commit()?;
        self.poas.commit()?;
        self.locked.commit()?;
        self.events.commit()
    }

    fn discard(&mut self) -> Result<(), StoreError> {
        self.check_depths()?;
        self.status.discard()?;
        self.contracts.discard()?;
        self.balances.discard()?;
        self.namespaces.discard()?;
        self.encumbrances.discard()?;
        self.poas.discard()?;
        self.locked.discard()?;
        self.events.discard()
    }

    fn depth(&self) -> usize {
        self.contracts.depth()
    }
}

impl PermissionLookup for StateSnapshot {
    fn address_permissions(&self, address: &str) -> u64 {
        self.balances
            .find(address)
            .map(|entry| entry.permissions)
            .unwrap_or(0)
    }

    fn can_use_tx(&self, address: &str, tx_type: TxType) -> bool {
        self.balances
            .find(address)
            .is_some_and(|entry| entry.can_use_tx(tx_type))
    }

    fn authorise_by_address(&self) -> bool {
        self.config.authorise_by_address
    }
}
