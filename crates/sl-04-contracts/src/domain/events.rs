//! Notifications buffered in the snapshot and forwarded to an
//! [`EventSink`](crate::ports::EventSink) once they reach the root layer.

use crate::domain::contract::ContractFamily;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp};
use std::collections::BTreeSet;
use std::fmt;

/// Phase name of the contract event that asks for a settlement run.
pub const COMMIT_PHASE: &str = "commit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeCycleKind {
    New,
    Commit,
    Cancel,
    Complete,
    Expire,
}

impl fmt::Display for LifeCycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifeCycleKind::New => "NEW",
            LifeCycleKind::Commit => "COMMIT",
            LifeCycleKind::Cancel => "CANCEL",
            LifeCycleKind::Complete => "COMPLETE",
            LifeCycleKind::Expire => "EXPIRE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A contract needs processing, e.g. a settlement attempt after a commit.
    Contract {
        address: Address,
        function: ContractFamily,
        phase: String,
        detail: String,
    },
    LifeCycle {
        kind: LifeCycleKind,
        address: Address,
        participants: BTreeSet<Address>,
    },
    AddEventTime {
        address: Address,
        at: Timestamp,
    },
    RemoveEventTime {
        address: Address,
        at: Timestamp,
    },
}

impl LedgerEvent {
    /// Address of the settlement request carried by this event, if any.
    pub fn settlement_request(&self) -> Option<&str> {
        match self {
            LedgerEvent::Contract { address, phase, .. } if phase == COMMIT_PHASE => Some(address),
            _ => None,
        }
    }
}
