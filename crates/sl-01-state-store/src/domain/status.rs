//! Per-layer corruption flag.

use crate::domain::StoreError;
use crate::ports::Layered;
use ledger_telemetry::{log_event, subsystems};

/// Corruption state of each snapshot layer.
///
/// Marking a layer corrupted is one-way: the first cause is kept and the
/// layer can only be discarded. Child layers opened on top of a corrupted
/// layer start corrupted.
#[derive(Debug, Clone)]
pub struct SnapshotStatus {
    layers: Vec<Option<String>>,
}

impl Default for SnapshotStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStatus {
    pub fn new() -> Self {
        Self {
            layers: vec![None],
        }
    }

    /// Mark the top layer corrupted by the transaction identified by `cause`.
    pub fn set_corrupted(&mut self, cause: impl Into<String>) {
        let depth = self.layers.len();
        if let Some(top) = self.layers.last_mut() {
            if top.is_none() {
                let cause = cause.into();
                log_event!(
                    error,
                    subsystems::STATE_STORE,
                    "Snapshot marked corrupted",
                    cause = %cause,
                    depth = depth
                );
                *top = Some(cause);
            }
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.corruption_cause().is_some()
    }

    pub fn corruption_cause(&self) -> Option<&str> {
        self.layers.last().and_then(|cause| cause.as_deref())
    }
}

impl Layered for SnapshotStatus {
    fn create_snapshot(&mut self) {
        let inherited = self.layers.last().cloned().flatten();
        self.layers.push(inherited);
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.layers.len() < 2 {
            return Err(StoreError::NoParentLayer {
                collection: "status",
                operation: "commit",
            });
        }
        if let Some(cause) = self.corruption_cause() {
            return Err(StoreError::Corrupted {
                cause: cause.to_string(),
            });
        }
        self.layers.pop();
        Ok(())
    }

    fn discard(&mut self) -> Result<(), StoreError> {
        if self.layers.len() < 2 {
            return Err(StoreError::NoParentLayer {
                collection: "status",
                operation: "discard",
            });
        }
        self.layers.pop();
        Ok(())
    }

    fn depth(&self) -> usize {
        self.layers.len()
    }
}
