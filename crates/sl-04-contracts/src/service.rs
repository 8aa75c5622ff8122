//! # Settlement Service
//!
//! Runs every transaction and contract event inside a child layer of the
//! caller's snapshot:
//!
//! ```text
//!   create_snapshot()
//!        │
//!   engine (validate → apply)
//!        │
//!        ├─ check-only / FAIL ──► discard()
//!        ├─ corrupted ──────────► discard(), flag the enclosing layer
//!        └─ PASS / WARNING ─────► queue settlement requests, commit()
//! ```
//!
//! Settlement requests raised by accepted operations are queued and run by
//! [`SettlementApi::settle_pending`], together with every time event due.

use crate::domain::{EventKind, LedgerEvent, LedgerTx, StateConfig, StateSnapshot};
use crate::engine::{self, Collaborators};
use crate::ports::inbound::SettlementApi;
use crate::ports::outbound::{EventSink, MathEvaluator};
use ledger_telemetry::{log_event, log_tx_event, subsystems};
use shared_types::{MessageHasher, Outcome, SignatureVerifier, Timestamp};
use sl_01_state_store::Layered;
use std::collections::VecDeque;
use tracing::instrument;

/// Settlement service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Configuration of snapshots created by [`SettlementService::new_snapshot`].
    pub state: StateConfig,
    /// Run check-only calls in a child layer too. When disabled they run
    /// directly against the caller's layer.
    pub check_only_in_child_layer: bool,
    /// Mark the enclosing layer corrupted when an operation corrupts its
    /// child layer.
    pub propagate_corruption: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            state: StateConfig::default(),
            check_only_in_child_layer: true,
            propagate_corruption: true,
        }
    }
}

impl ServiceConfig {
    /// Defaults, with the state section read from `SL_*` variables.
    pub fn from_env() -> Self {
        Self {
            state: StateConfig::from_env(),
            ..Self::default()
        }
    }
}

/// Counters over every operation the service ran.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub accepted: u64,
    pub warnings: u64,
    pub rejected: u64,
    pub corrupted: u64,
}

/// Contract settlement over injected collaborators.
pub struct SettlementService {
    config: ServiceConfig,
    verifier: Box<dyn SignatureVerifier>,
    hasher: Box<dyn MessageHasher>,
    math: Box<dyn MathEvaluator>,
    stats: ServiceStats,
    /// Contracts with an outstanding settlement request, oldest first.
    pending: VecDeque<String>,
}

impl SettlementService {
    pub fn new(
        config: ServiceConfig,
        verifier: Box<dyn SignatureVerifier>,
        hasher: Box<dyn MessageHasher>,
        math: Box<dyn MathEvaluator>,
    ) -> Self {
        Self {
            config,
            verifier,
            hasher,
            math,
            stats: ServiceStats::default(),
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// Contracts waiting for a settlement attempt.
    pub fn pending(&self) -> impl Iterator<Item = &str> + '_ {
        self.pending.iter().map(String::as_str)
    }

    /// Empty snapshot using the configured state settings.
    pub fn new_snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(self.config.state.clone())
    }

    /// Run `operation` in a child layer and settle the layer by its outcome.
    fn run_layered<F>(&mut self, snapshot: &mut StateSnapshot, cause: &str, check_only: bool, operation: F) -> Outcome
    where
        F: FnOnce(&Collaborators<'_>, &mut StateSnapshot) -> Outcome,
    {
        if snapshot.is_corrupted() {
            let reason = snapshot.corruption_cause().unwrap_or("unknown").to_string();
            self.stats.rejected += 1;
            log_tx_event!(warn, subsystems::SETTLEMENT, "Refusing operation on corrupted state", cause, reason = %reason);
            return Outcome::fail(format!("State corrupted ({reason}), {cause} not applied"));
        }

        let layered = !check_only || self.config.check_only_in_child_layer;
        if layered {
            snapshot.create_snapshot();
        }

        let outcome = {
            let ctx = Collaborators::new(self.verifier.as_ref(), self.hasher.as_ref(), self.math.as_ref());
            operation(&ctx, snapshot)
        };
        let corruption = snapshot
            .is_corrupted()
            .then(|| snapshot.corruption_cause().unwrap_or(cause).to_string());

        if layered {
            let keep = !check_only && !outcome.is_fail() && corruption.is_none();
            let settled = if keep {
                let requests: Vec<String> = snapshot
                    .events
                    .pending()
                    .iter()
                    .filter_map(LedgerEvent::settlement_request)
                    .map(str::to_string)
                    .collect();
                for address in requests {
                    if !self.pending.contains(&address) {
                        self.pending.push_back(address);
                    }
                }
                snapshot.commit()
            } else {
                snapshot.discard()
            };
            if let Err(err) = settled {
                log_tx_event!(error, subsystems::SETTLEMENT, "Layer could not be settled", cause, error = %err);
                self.stats.corrupted += 1;
                snapshot.set_corrupted(format!("{cause}: {err}"));
                return Outcome::fail(format!("State corrupted while applying {cause} : {err}"));
            }
        }

        if let Some(reason) = corruption {
            self.stats.corrupted += 1;
            log_tx_event!(error, subsystems::SETTLEMENT, "Operation corrupted its layer", cause, reason = %reason);
            if layered && self.config.propagate_corruption {
                snapshot.set_corrupted(reason.clone());
            }
            if outcome.is_fail() {
                return outcome;
            }
            return Outcome::fail(format!("State corrupted while applying {cause} : {reason}"));
        }

        if outcome.is_fail() {
            self.stats.rejected += 1;
            log_tx_event!(debug, subsystems::SETTLEMENT, "Operation rejected", cause, reason = %outcome.message);
        } else if outcome.is_warning() {
            self.stats.warnings += 1;
            log_tx_event!(debug, subsystems::SETTLEMENT, "Operation passed with warning", cause, reason = %outcome.message);
        } else {
            self.stats.accepted += 1;
            log_tx_event!(debug, subsystems::SETTLEMENT, "Operation accepted", cause, check_only);
        }
        outcome
    }
}

impl SettlementApi for SettlementService {
    #[instrument(skip(self, snapshot, tx), fields(tx_hash = %tx.envelope().hash))]
    fn apply_tx(&mut self, snapshot: &mut StateSnapshot, tx: &LedgerTx, now: Timestamp, check_only: bool) -> Outcome {
        let cause = tx.envelope().hash.clone();
        self.run_layered(snapshot, &cause, check_only, |ctx, snapshot| {
            engine::apply_tx(ctx, snapshot, tx, now, check_only)
        })
    }

    #[instrument(skip(self, snapshot))]
    fn process_event(
        &mut self,
        snapshot: &mut StateSnapshot,
        contract_address: &str,
        kind: EventKind,
        now: Timestamp,
        check_only: bool,
    ) -> Outcome {
        self.run_layered(snapshot, contract_address, check_only, |ctx, snapshot| {
            engine::process_event(ctx, snapshot, contract_address, kind, now, check_only)
        })
    }

    #[instrument(skip(self, snapshot))]
    fn settle_pending(&mut self, snapshot: &mut StateSnapshot, now: Timestamp) -> Vec<(String, Outcome)> {
        let mut results = Vec::new();
        while let Some(address) = self.pending.pop_front() {
            let outcome = self.process_event(snapshot, &address, EventKind::Commit, now, false);
            results.push((address, outcome));
        }
        for (_, address) in snapshot.due_contracts(now) {
            let outcome = self.process_event(snapshot, &address, EventKind::Time, now, false);
            results.push((address, outcome));
        }
        log_event!(
            debug,
            subsystems::SETTLEMENT,
            "Pending contract events run",
            now,
            runs = results.len()
        );
        results
    }

    fn flush_events(&mut self, snapshot: &mut StateSnapshot, sink: &mut dyn EventSink) -> usize {
        let events = snapshot.events.drain_committed();
        let count = events.len();
        for event in events {
            match event {
                LedgerEvent::Contract {
                    address,
                    function,
                    phase,
                    detail,
                } => sink.add_contract_event(&address, function, &phase, &detail),
                LedgerEvent::LifeCycle {
                    kind,
                    address,
                    participants,
                } => sink.add_life_cycle_event(kind, &address, &participants),
                LedgerEvent::AddEventTime { address, at } => sink.add_contract_event_time(&address, at),
                LedgerEvent::RemoveEventTime { address, at } => sink.remove_contract_event_time(&address, at),
            }
        }
        count
    }
}
