//! # Contract Records
//!
//! Every contract is one [`ContractEntry`]: a header shared by all
//! families and a tagged family payload.
//!
//! ```text
//! ContractEntry
//! ├── header: address, function, completed, next_time_event, issuer, status
//! └── data:   Dvp(DvpContract) | Exchange(ExchangeContract) | TokensNominate(..)
//! ```
//!
//! Contracts are never deleted. Completion, cancellation and expiry only set
//! `completed` and clear the schedule.

use crate::domain::dvp::DvpContract;
use crate::domain::exchange::ExchangeContract;
use crate::domain::nominate::TokensNominateContract;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp};
use sl_01_state_store::StateEntry;
use std::collections::BTreeSet;
use std::fmt;

/// Contract family discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractFamily {
    Dvp,
    Exchange,
    TokensNominate,
}

impl ContractFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractFamily::Dvp => "dvp_uk",
            ContractFamily::Exchange => "exchange",
            ContractFamily::TokensNominate => "tokens_nominate",
        }
    }

    /// Parse a family name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            ContractFamily::Dvp,
            ContractFamily::Exchange,
            ContractFamily::TokensNominate,
        ]
        .into_iter()
        .find(|family| family.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ContractFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every contract carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractHeader {
    pub address: Address,
    pub function: ContractFamily,
    pub completed: bool,
    pub next_time_event: Option<Timestamp>,
    pub issuing_address: Address,
    pub status: String,
    pub cancel_time: Option<Timestamp>,
}

/// Family payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractData {
    Dvp(DvpContract),
    Exchange(ExchangeContract),
    TokensNominate(TokensNominateContract),
}

impl ContractData {
    pub fn family(&self) -> ContractFamily {
        match self {
            ContractData::Dvp(_) => ContractFamily::Dvp,
            ContractData::Exchange(_) => ContractFamily::Exchange,
            ContractData::TokensNominate(_) => ContractFamily::TokensNominate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub header: ContractHeader,
    pub data: ContractData,
}

impl ContractEntry {
    pub fn new(address: impl Into<Address>, issuing_address: impl Into<Address>, data: ContractData) -> Self {
        Self {
            header: ContractHeader {
                address: address.into(),
                function: data.family(),
                completed: false,
                next_time_event: None,
                issuing_address: issuing_address.into(),
                status: String::new(),
                cancel_time: None,
            },
            data,
        }
    }

    pub fn address(&self) -> &str {
        &self.header.address
    }

    pub fn family(&self) -> ContractFamily {
        self.header.function
    }

    pub fn is_completed(&self) -> bool {
        self.header.completed
    }

    pub fn dvp(&self) -> Option<&DvpContract> {
        match &self.data {
            ContractData::Dvp(dvp) => Some(dvp),
            _ => None,
        }
    }

    pub fn dvp_mut(&mut self) -> Option<&mut DvpContract> {
        match &mut self.data {
            ContractData::Dvp(dvp) => Some(dvp),
            _ => None,
        }
    }

    pub fn exchange(&self) -> Option<&ExchangeContract> {
        match &self.data {
            ContractData::Exchange(exchange) => Some(exchange),
            _ => None,
        }
    }

    pub fn tokens_nominate(&self) -> Option<&TokensNominateContract> {
        match &self.data {
            ContractData::TokensNominate(nominate) => Some(nominate),
            _ => None,
        }
    }

    /// Move the contract to its terminal state.
    pub fn finish(&mut self, status: impl Into<String>) {
        self.header.completed = true;
        self.header.status = status.into();
        self.header.next_time_event = None;
    }

    /// The issuer plus every address named by the payload.
    pub fn participants(&self) -> BTreeSet<Address> {
        let mut addresses: BTreeSet<Address> = match &self.data {
            ContractData::Dvp(dvp) => dvp.addresses(),
            ContractData::Exchange(exchange) => exchange.addresses().into_iter().collect(),
            ContractData::TokensNominate(_) => BTreeSet::new(),
        };
        if !self.header.issuing_address.is_empty() {
            addresses.insert(self.header.issuing_address.clone());
        }
        addresses
    }
}

impl StateEntry for ContractEntry {
    fn key(&self) -> &str {
        &self.header.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dvp::{DvpParty, DvpReceiveItem};

    #[test]
    fn test_family_names() {
        assert_eq!(ContractFamily::Dvp.as_str(), "dvp_uk");
        assert_eq!(ContractFamily::from_name("EXCHANGE"), Some(ContractFamily::Exchange));
        assert_eq!(ContractFamily::from_name("tokens_nominate"), Some(ContractFamily::TokensNominate));
        assert_eq!(ContractFamily::from_name("dvp_commit"), None);
    }

    #[test]
    fn test_new_entry_header() {
        let entry = ContractEntry::new("c1", "issuer", ContractData::Exchange(ExchangeContract::default()));
        assert_eq!(entry.key(), "c1");
        assert_eq!(entry.family(), ContractFamily::Exchange);
        assert!(!entry.is_completed());
        assert!(entry.dvp().is_none());
        assert!(entry.exchange().is_some());
    }

    #[test]
    fn test_finish_clears_schedule() {
        let mut entry = ContractEntry::new("c1", "issuer", ContractData::Dvp(DvpContract::default()));
        entry.header.next_time_event = Some(50);
        entry.finish("Expired");
        assert!(entry.is_completed());
        assert_eq!(entry.header.status, "Expired");
        assert_eq!(entry.header.next_time_event, None);
    }

    #[test]
    fn test_participants() {
        let dvp = DvpContract {
            parties: vec![DvpParty {
                sig_address: "a".to_string(),
                receive_list: vec![DvpReceiveItem {
                    address: "b".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let entry = ContractEntry::new("c1", "issuer", ContractData::Dvp(dvp));
        let participants: Vec<_> = entry.participants().into_iter().collect();
        assert_eq!(participants, vec!["a", "b", "issuer"]);
    }
}
