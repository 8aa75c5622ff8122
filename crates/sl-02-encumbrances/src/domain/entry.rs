use serde::{Deserialize, Serialize};
use shared_types::{Address, Balance, Timestamp};
use std::collections::BTreeSet;

/// Priority assigned to entries before they are ordered.
pub const DEFAULT_PRIORITY: i32 = i32::MAX;

/// Priority of entries added ahead of everything else.
pub const HIGH_PRIORITY: i32 = -1;

/// Where a new entry is placed relative to existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// After every existing entry.
    Normal,
    /// Ahead of every existing entry.
    High,
}

/// How an add treats an existing entry with the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddMode {
    /// Accumulate onto the existing reference.
    Cumulative,
    /// Reject if the reference is already in use.
    Exclusive,
}

/// An address with a validity window, used for beneficiaries and
/// administrators. `end_time == 0` means open ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncumbranceDetail {
    pub address: Address,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl EncumbranceDetail {
    pub fn new(address: impl Into<Address>, start_time: Timestamp, end_time: Timestamp) -> Self {
        Self {
            address: address.into(),
            start_time,
            end_time,
        }
    }

    /// Open-ended detail valid from the epoch.
    pub fn open(address: impl Into<Address>) -> Self {
        Self::new(address, 0, 0)
    }

    /// Is this detail for `address` and valid at `now`? Bounds are inclusive.
    pub fn is_valid_for(&self, address: &str, now: Timestamp) -> bool {
        self.start_time <= now
            && (self.end_time == 0 || self.end_time >= now)
            && self.address.eq_ignore_ascii_case(address)
    }
}

/// A named lock against part of a holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncumbranceEntry {
    pub reference: String,
    pub amount: Balance,
    pub priority: i32,
    beneficiaries: Vec<EncumbranceDetail>,
    administrators: Vec<EncumbranceDetail>,
    expiry: Timestamp,
}

impl EncumbranceEntry {
    pub fn new(
        reference: impl Into<String>,
        amount: Balance,
        beneficiaries: Vec<EncumbranceDetail>,
        administrators: Vec<EncumbranceDetail>,
    ) -> Self {
        let mut entry = Self {
            reference: reference.into(),
            amount,
            priority: DEFAULT_PRIORITY,
            beneficiaries,
            administrators: Vec::new(),
            expiry: Timestamp::MAX,
        };
        entry.set_administrators(administrators);
        entry
    }

    pub fn beneficiaries(&self) -> &[EncumbranceDetail] {
        &self.beneficiaries
    }

    pub fn administrators(&self) -> &[EncumbranceDetail] {
        &self.administrators
    }

    /// Latest administrator end time, `Timestamp::MAX` when open ended.
    pub fn expiry(&self) -> Timestamp {
        self.expiry
    }

    pub fn set_beneficiaries(&mut self, beneficiaries: Vec<EncumbranceDetail>) {
        self.beneficiaries = beneficiaries;
    }

    pub fn set_administrators(&mut self, administrators: Vec<EncumbranceDetail>) {
        self.expiry = if administrators.is_empty()
            || administrators.iter().any(|detail| detail.end_time == 0)
        {
            Timestamp::MAX
        } else {
            administrators
                .iter()
                .map(|detail| detail.end_time)
                .max()
                .unwrap_or(Timestamp::MAX)
        };
        self.administrators = administrators;
    }

    pub fn matches(&self, reference: &str) -> bool {
        self.reference.eq_ignore_ascii_case(reference)
    }

    /// An entry expires once no administrator can act on it any more.
    /// Entries without administrators never expire.
    pub fn has_expired(&self, now: Timestamp) -> bool {
        if now <= self.expiry {
            return false;
        }
        !self.administrators.iter().any(|detail| {
            !detail.address.is_empty() && (detail.end_time == 0 || detail.end_time > now)
        })
    }

    pub fn is_beneficiary_valid(&self, address: &str, now: Timestamp) -> bool {
        self.beneficiaries
            .iter()
            .any(|detail| detail.is_valid_for(address, now))
    }

    pub fn is_administrator_valid(&self, address: &str, now: Timestamp) -> bool {
        self.administrators
            .iter()
            .any(|detail| detail.is_valid_for(address, now))
    }

    /// Can `other` be accumulated onto this entry? References must match and
    /// both authorisation sets must be equal (or both empty).
    pub fn can_accumulate(&self, other: &EncumbranceEntry) -> bool {
        fn same_set(a: &[EncumbranceDetail], b: &[EncumbranceDetail]) -> bool {
            let a: BTreeSet<&EncumbranceDetail> = a.iter().collect();
            let b: BTreeSet<&EncumbranceDetail> = b.iter().collect();
            a == b
        }

        !self.reference.is_empty()
            && self.matches(&other.reference)
            && same_set(&self.beneficiaries, &other.beneficiaries)
            && same_set(&self.administrators, &other.administrators)
    }
}
