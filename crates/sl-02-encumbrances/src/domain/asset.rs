use crate::domain::entry::{AddMode, EncumbranceEntry, Priority, HIGH_PRIORITY};
use ledger_telemetry::{log_event, subsystems};
use serde::{Deserialize, Serialize};
use shared_types::{Balance, BalanceError, Timestamp};

const PRIORITY_STEP: i32 = 10;

/// Encumbrances held against one asset at one address.
///
/// `entries` is always sorted by priority with priorities renumbered
/// 0, 10, 20, ... after every insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEncumbrances {
    entries: Vec<EncumbranceEntry>,
    total: Balance,
}

impl AssetEncumbrances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[EncumbranceEntry] {
        &self.entries
    }

    /// Cached total of all entries, expired ones included.
    pub fn total(&self) -> Balance {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an encumbrance. Returns `Ok(false)` without touching anything if
    /// the entry is rejected.
    pub fn add_encumbrance(
        &mut self,
        entry: EncumbranceEntry,
        priority: Priority,
        mode: AddMode,
    ) -> Result<bool, BalanceError> {
        if !entry.amount.is_positive() || entry.reference.is_empty() {
            return Ok(false);
        }

        if let Some(existing) = self.any_by_reference(&entry.reference) {
            match mode {
                AddMode::Exclusive => return Ok(false),
                AddMode::Cumulative if !existing.can_accumulate(&entry) => return Ok(false),
                AddMode::Cumulative => {}
            }
        }

        let mut entry = entry;
        if priority == Priority::High {
            entry.priority = HIGH_PRIORITY;
        }
        log_event!(
            debug,
            subsystems::ENCUMBRANCES,
            "Encumbrance added",
            reference = %entry.reference,
            amount = %entry.amount
        );
        self.entries.push(entry);
        self.recalc_priorities()?;
        Ok(true)
    }

    /// Sort, merge adjacent fragments of one reference and renumber.
    fn recalc_priorities(&mut self) -> Result<(), BalanceError> {
        self.entries.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.reference.to_lowercase().cmp(&b.reference.to_lowercase()))
                .then_with(|| a.amount.cmp(&b.amount))
        });

        let mut merged: Vec<EncumbranceEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match merged.last_mut() {
                Some(last) if last.matches(&entry.reference) => {
                    last.amount = last.amount.checked_add(entry.amount)?;
                }
                _ => merged.push(entry),
            }
        }
        let mut next = 0;
        for entry in merged.iter_mut() {
            entry.priority = next;
            next = next.saturating_add(PRIORITY_STEP);
        }
        self.entries = merged;
        self.recalculate_total().map(|_| ())
    }

    /// Drop exhausted entries and refresh the cached total.
    pub fn recalculate_total(&mut self) -> Result<Balance, BalanceError> {
        self.entries.retain(|entry| !entry.amount.is_zero());
        self.total = self
            .entries
            .iter()
            .try_fold(Balance::ZERO, |sum, entry| sum.checked_add(entry.amount))?;
        Ok(self.total)
    }

    /// How much of `held` is still free once every unexpired entry ranked
    /// before `reference` has been honoured.
    ///
    /// With no reference (or an unknown one) every unexpired entry counts.
    /// Never negative; a negative holding has nothing available.
    pub fn available_to_encumbrance(
        &self,
        held: Balance,
        reference: Option<&str>,
        now: Timestamp,
    ) -> Result<Balance, BalanceError> {
        if held.is_negative() {
            return Ok(Balance::ZERO);
        }
        let mut committed = Balance::ZERO;
        for entry in &self.entries {
            if reference.is_some_and(|name| entry.matches(name)) {
                break;
            }
            if entry.has_expired(now) {
                continue;
            }
            committed = committed.checked_add(entry.amount)?;
        }
        Ok(held.checked_sub(committed)?.max(Balance::ZERO))
    }

    /// The part of `holding` that actually backs `reference`, walking entries
    /// in priority order. `None` if the reference is unknown.
    pub fn aggregate_available_by_reference(
        &self,
        reference: &str,
        holding: Balance,
    ) -> Result<Option<EncumbranceEntry>, BalanceError> {
        let mut remaining = holding.max(Balance::ZERO);
        let mut aggregate: Option<EncumbranceEntry> = None;

        for entry in &self.entries {
            if entry.matches(reference) {
                let covered = entry.amount.min(remaining.max(Balance::ZERO));
                match aggregate.as_mut() {
                    Some(found) => found.amount = found.amount.checked_add(covered)?,
                    None => {
                        let mut first = entry.clone();
                        first.amount = covered;
                        aggregate = Some(first);
                    }
                }
            }
            remaining = remaining.checked_sub(entry.amount)?;
            if aggregate.is_some() && !remaining.is_positive() {
                break;
            }
        }
        Ok(aggregate)
    }

    /// All fragments of `reference` combined into one entry that keeps the
    /// earliest priority.
    pub fn aggregate_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<EncumbranceEntry>, BalanceError> {
        let mut aggregate: Option<EncumbranceEntry> = None;
        for entry in self.entries.iter().filter(|e| e.matches(reference)) {
            match aggregate.as_mut() {
                Some(found) => found.amount = found.amount.checked_add(entry.amount)?,
                None => aggregate = Some(entry.clone()),
            }
        }
        Ok(aggregate)
    }

    pub fn any_by_reference(&self, reference: &str) -> Option<&EncumbranceEntry> {
        self.entries.iter().find(|entry| entry.matches(reference))
    }

    pub fn by_reference(&self, reference: &str) -> Vec<&EncumbranceEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.matches(reference))
            .collect()
    }

    pub fn amount_by_reference(&self, reference: &str) -> Result<Balance, BalanceError> {
        self.by_reference(reference)
            .into_iter()
            .try_fold(Balance::ZERO, |sum, entry| sum.checked_add(entry.amount))
    }

    /// Total of unexpired entries at `now`.
    pub fn total_amount(&self, now: Timestamp) -> Result<Balance, BalanceError> {
        self.entries
            .iter()
            .filter(|entry| !entry.has_expired(now))
            .try_fold(Balance::ZERO, |sum, entry| sum.checked_add(entry.amount))
    }

    /// Consume `amount` of `reference`, highest priority fragment first.
    /// Exhausted fragments are removed. Returns the new total.
    pub fn consume_encumbrance(
        &mut self,
        reference: &str,
        amount: Balance,
    ) -> Result<Balance, BalanceError> {
        let order: Vec<usize> = (0..self.entries.len()).collect();
        self.deplete(reference, amount, order)
    }

    /// Like [`Self::consume_encumbrance`] but lowest priority fragment first.
    pub fn reduce_encumbrance(
        &mut self,
        reference: &str,
        amount: Balance,
    ) -> Result<Balance, BalanceError> {
        let order: Vec<usize> = (0..self.entries.len()).rev().collect();
        self.deplete(reference, amount, order)
    }

    fn deplete(
        &mut self,
        reference: &str,
        amount: Balance,
        order: Vec<usize>,
    ) -> Result<Balance, BalanceError> {
        let mut remaining = amount.abs();
        for index in order {
            if !remaining.is_positive() {
                break;
            }
            if let Some(entry) = self.entries.get_mut(index) {
                if entry.matches(reference) {
                    let delta = remaining.min(entry.amount.max(Balance::ZERO));
                    entry.amount = entry.amount.checked_sub(delta)?;
                    remaining = remaining.checked_sub(delta)?;
                }
            }
        }
        self.recalculate_total()
    }

    /// Remove every fragment of `reference` and return them.
    pub fn remove_encumbrance(
        &mut self,
        reference: &str,
    ) -> Result<Vec<EncumbranceEntry>, BalanceError> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.matches(reference));
        self.entries = kept;
        if !removed.is_empty() {
            self.recalculate_total()?;
        }
        Ok(removed)
    }
}
