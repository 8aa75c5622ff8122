use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("No parent layer to {operation} in `{collection}`")]
    NoParentLayer {
        collection: &'static str,
        operation: &'static str,
    },

    #[error("Snapshot is corrupted (cause: {cause}), it must be discarded")]
    Corrupted { cause: String },

    #[error("Layer depth mismatch in `{collection}`: expected {expected}, found {found}")]
    DepthMismatch {
        collection: &'static str,
        expected: usize,
        found: usize,
    },
}
