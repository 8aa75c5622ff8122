//! # Core Ledger Entities
//!
//! Identifiers, the checked [`Balance`] amount type, transaction kinds and the
//! address permission bitmask.

use crate::errors::BalanceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger address (textual, as produced by the address verifier).
pub type Address = String;

/// Encoded public key.
pub type PublicKey = String;

/// Encoded signature.
pub type Signature = String;

/// Full asset identifier, `namespace|class`.
pub type AssetId = String;

/// Unix time in seconds.
pub type Timestamp = i64;

/// Separator between namespace and class in a full asset identifier.
pub const ASSET_SEPARATOR: char = '|';

/// Build the full asset identifier for a namespace and class.
pub fn full_asset_id(namespace: &str, class: &str) -> AssetId {
    format!("{namespace}{ASSET_SEPARATOR}{class}")
}

/// Split a full asset identifier into `(namespace, class)`.
pub fn split_asset_id(asset_id: &str) -> Option<(&str, &str)> {
    asset_id.split_once(ASSET_SEPARATOR)
}

// =============================================================================
// BALANCE
// =============================================================================

/// Signed integer amount used for every balance decision.
///
/// All arithmetic is checked; overflow and division by zero surface as
/// [`BalanceError`] so the settlement engine can treat them as faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(i128);

impl Balance {
    /// Zero.
    pub const ZERO: Balance = Balance(0);

    /// One unit.
    pub const ONE: Balance = Balance(1);

    /// Wrap a raw value.
    pub const fn new(value: i128) -> Self {
        Self(value)
    }

    /// Raw value.
    pub const fn value(&self) -> i128 {
        self.0
    }

    pub fn checked_add(self, other: Balance) -> Result<Balance, BalanceError> {
        self.0
            .checked_add(other.0)
            .map(Balance)
            .ok_or(BalanceError::Overflow {
                operation: "add",
                left: self.0,
                right: other.0,
            })
    }

    pub fn checked_sub(self, other: Balance) -> Result<Balance, BalanceError> {
        self.0
            .checked_sub(other.0)
            .map(Balance)
            .ok_or(BalanceError::Overflow {
                operation: "subtract",
                left: self.0,
                right: other.0,
            })
    }

    pub fn checked_mul(self, other: Balance) -> Result<Balance, BalanceError> {
        self.0
            .checked_mul(other.0)
            .map(Balance)
            .ok_or(BalanceError::Overflow {
                operation: "multiply",
                left: self.0,
                right: other.0,
            })
    }

    /// Integer division truncating toward zero.
    pub fn checked_div(self, other: Balance) -> Result<Balance, BalanceError> {
        if other.0 == 0 {
            return Err(BalanceError::DivisionByZero(self.0));
        }
        self.0
            .checked_div(other.0)
            .map(Balance)
            .ok_or(BalanceError::Overflow {
                operation: "divide",
                left: self.0,
                right: other.0,
            })
    }

    pub fn checked_rem(self, other: Balance) -> Result<Balance, BalanceError> {
        if other.0 == 0 {
            return Err(BalanceError::DivisionByZero(self.0));
        }
        self.0
            .checked_rem(other.0)
            .map(Balance)
            .ok_or(BalanceError::Overflow {
                operation: "modulus",
                left: self.0,
                right: other.0,
            })
    }

    pub fn abs(self) -> Balance {
        Balance(self.0.saturating_abs())
    }

    pub fn negate(self) -> Balance {
        Balance(self.0.saturating_neg())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i128> for Balance {
    fn from(value: i128) -> Self {
        Balance(value)
    }
}

impl From<i64> for Balance {
    fn from(value: i64) -> Self {
        Balance(i128::from(value))
    }
}

impl From<u64> for Balance {
    fn from(value: u64) -> Self {
        Balance(i128::from(value))
    }
}

impl FromStr for Balance {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i128>()
            .map(Balance)
            .map_err(|_| BalanceError::InvalidLiteral(s.to_string()))
    }
}

// =============================================================================
// TRANSACTION KINDS AND ADDRESS TYPES
// =============================================================================

/// Address derivation flavour passed to the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    /// Key-holder address.
    Normal,
    /// Contract address, derived from the author key and a nonce.
    Contract,
}

/// Transaction kinds relevant to the settlement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    NewContract,
    CommitToContract,
    EncumberAsset,
    PoaNewContract,
    PoaCommitToContract,
}

impl TxType {
    /// The power-of-attorney flavour of this kind, as authored by an attorney.
    pub fn poa_variant(self) -> TxType {
        match self {
            TxType::NewContract | TxType::PoaNewContract => TxType::PoaNewContract,
            TxType::CommitToContract | TxType::PoaCommitToContract => TxType::PoaCommitToContract,
            TxType::EncumberAsset => TxType::EncumberAsset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::NewContract => "new_contract",
            TxType::CommitToContract => "commit_to_contract",
            TxType::EncumberAsset => "encumber_asset",
            TxType::PoaNewContract => "poa_new_contract",
            TxType::PoaCommitToContract => "poa_commit_to_contract",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address permission bits.
pub mod permissions {
    pub const AP_ADMIN: u64 = 0x1;
    pub const AP_LOCK: u64 = 0x400;
    pub const AP_CONTRACT: u64 = 0x800;
    pub const AP_POA: u64 = 0x1000;
    pub const AP_POA_EXERCISE: u64 = 0x2000;
    pub const AP_COMMIT: u64 = 0x4000;

    /// Permission set allowing new contracts.
    pub const AP_CONTRACTS: u64 = AP_ADMIN | AP_CONTRACT;
    /// Permission set allowing contract commitments.
    pub const AP_COMMITS: u64 = AP_ADMIN | AP_COMMIT;
    /// Permission set allowing an attorney to exercise a POA.
    pub const AP_POA_EXERCISES: u64 = AP_ADMIN | AP_POA_EXERCISE;
}
