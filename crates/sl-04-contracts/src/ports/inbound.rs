//! # Driving Ports (API - Inbound)
//!
//! The interface block processing uses to apply transactions and contract
//! events against a snapshot.

use crate::domain::{EventKind, LedgerTx, StateSnapshot};
use crate::ports::outbound::EventSink;
use shared_types::{Outcome, Timestamp};

/// Settlement API.
///
/// Every call returns an [`Outcome`]. A FAIL never changes state; a
/// `check_only` call never changes state whatever its status.
pub trait SettlementApi {
    // === Transactions ===

    /// Apply one transaction at block time `now`.
    fn apply_tx(
        &mut self,
        snapshot: &mut StateSnapshot,
        tx: &LedgerTx,
        now: Timestamp,
        check_only: bool,
    ) -> Outcome;

    // === Contract Events ===

    /// Run a settlement attempt or time event for one contract.
    fn process_event(
        &mut self,
        snapshot: &mut StateSnapshot,
        contract_address: &str,
        kind: EventKind,
        now: Timestamp,
        check_only: bool,
    ) -> Outcome;

    /// Run every queued settlement request, then every time event due at
    /// `now`. Returns the outcome of each run, keyed by contract address.
    fn settle_pending(&mut self, snapshot: &mut StateSnapshot, now: Timestamp) -> Vec<(String, Outcome)>;

    // === Notifications ===

    /// Forward events that reached the root layer and return how many.
    fn flush_events(&mut self, snapshot: &mut StateSnapshot, sink: &mut dyn EventSink) -> usize;
}
