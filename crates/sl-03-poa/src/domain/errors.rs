use shared_types::TxType;
use thiserror::Error;

/// Faults raised while consuming a grant that was already checked.
///
/// These only happen in the apply phase, so callers treat them as snapshot
/// corruption rather than as a rejection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoaError {
    #[error("POA detail `{reference}` for {address} vanished before it could be consumed")]
    DetailMissing { address: String, reference: String },

    #[error("POA `{reference}` has no {tx_type} item at index {index}")]
    ItemMissing {
        reference: String,
        tx_type: TxType,
        index: usize,
    },
}
