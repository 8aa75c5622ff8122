//! # Error Types
//!
//! Faults raised while a contract operation is mutating the snapshot. They
//! are never returned for an ordinary rejection: those are [`Outcome`]
//! values.
//!
//! [`Outcome`]: shared_types::Outcome

use shared_types::BalanceError;
use sl_01_state_store::StoreError;
use sl_03_poa::PoaError;
use thiserror::Error;

/// Faults that leave the snapshot in an untrustworthy state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Balance arithmetic overflowed or divided by zero.
    #[error("arithmetic fault: {0}")]
    Arithmetic(#[from] BalanceError),

    /// A layer operation failed.
    #[error("state store fault: {0}")]
    Store(#[from] StoreError),

    /// A POA grant vanished between check and consumption.
    #[error("POA fault: {0}")]
    Poa(#[from] PoaError),

    /// An entry validated earlier is no longer in state.
    #[error("{kind} `{key}` missing during apply")]
    MissingEntry { kind: &'static str, key: String },

    /// Formula evaluation failed after validation passed.
    #[error("formula `{expression}` could not be evaluated: {reason}")]
    Formula { expression: String, reason: String },

    /// Any other broken invariant.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl SettlementError {
    pub fn missing(kind: &'static str, key: impl Into<String>) -> Self {
        SettlementError::MissingEntry {
            kind,
            key: key.into(),
        }
    }
}
