use crate::domain::item::PoaItem;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Balance, BalanceError, Timestamp, TxType};
use sl_01_state_store::StateEntry;
use std::collections::BTreeMap;

/// Key of the detail record for `reference` granted by `address`.
pub fn full_reference(address: &str, reference: &str) -> String {
    format!("{address}|{reference}")
}

/// Validity window of one POA reference, held in the grantor's header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoaHeader {
    pub reference: String,
    pub start: Timestamp,
    pub expiry: Timestamp,
}

impl PoaHeader {
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.start <= now && self.expiry >= now
    }
}

/// The grant itself: who may act, for whom, and with what allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoaDetail {
    pub reference: String,
    pub issuer: Address,
    pub attorney: Address,
    pub start: Timestamp,
    pub end: Timestamp,
    pub items: Vec<PoaItem>,
}

impl PoaDetail {
    /// Indices of the items that cover `tx_type`, in grant order.
    pub fn items_for(&self, tx_type: TxType) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.tx_type == tx_type)
            .map(|(index, _)| index)
            .collect()
    }

    /// Remaining allowance across every item.
    pub fn sum_amounts(&self) -> Result<Balance, BalanceError> {
        self.items
            .iter()
            .try_fold(Balance::ZERO, |sum, item| sum.checked_add(item.amount))
    }
}

/// A record in the POA collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoaEntry {
    /// Every reference granted by one address, keyed by that address.
    Header {
        address: Address,
        references: BTreeMap<String, PoaHeader>,
    },
    /// One grant, keyed by `"address|reference"`.
    Detail { key: String, detail: PoaDetail },
}

impl PoaEntry {
    pub fn header(address: impl Into<Address>) -> Self {
        PoaEntry::Header {
            address: address.into(),
            references: BTreeMap::new(),
        }
    }

    pub fn detail(address: &str, detail: PoaDetail) -> Self {
        PoaEntry::Detail {
            key: full_reference(address, &detail.reference),
            detail,
        }
    }

    pub fn reference(&self, reference: &str) -> Option<&PoaHeader> {
        match self {
            PoaEntry::Header { references, .. } => references.get(reference),
            PoaEntry::Detail { .. } => None,
        }
    }

    pub fn set_reference(&mut self, header: PoaHeader) {
        if let PoaEntry::Header { references, .. } = self {
            references.insert(header.reference.clone(), header);
        }
    }

    pub fn remove_reference(&mut self, reference: &str) -> Option<PoaHeader> {
        match self {
            PoaEntry::Header { references, .. } => references.remove(reference),
            PoaEntry::Detail { .. } => None,
        }
    }

    pub fn reference_count(&self) -> usize {
        match self {
            PoaEntry::Header { references, .. } => references.len(),
            PoaEntry::Detail { .. } => 0,
        }
    }

    pub fn poa_detail(&self) -> Option<&PoaDetail> {
        match self {
            PoaEntry::Detail { detail, .. } => Some(detail),
            PoaEntry::Header { .. } => None,
        }
    }

    pub fn poa_detail_mut(&mut self) -> Option<&mut PoaDetail> {
        match self {
            PoaEntry::Detail { detail, .. } => Some(detail),
            PoaEntry::Header { .. } => None,
        }
    }
}

impl StateEntry for PoaEntry {
    fn key(&self) -> &str {
        match self {
            PoaEntry::Header { address, .. } => address,
            PoaEntry::Detail { key, .. } => key,
        }
    }
}
