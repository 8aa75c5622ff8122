//! # Contract Engine
//!
//! Validation and application of contract transactions and contract
//! events, one module per contract family.
//!
//! Every operation runs in two phases:
//!
//! ```text
//!   validate(snapshot, tx) ──► Checked<Plan>      reads only (plus POA resolution)
//!        │ Err(outcome)  → returned as is, nothing written
//!        ▼
//!   check_only?  ──► PASS "Check Only."
//!        ▼
//!   apply(snapshot, plan) ──► Result<Outcome, SettlementError>
//!        │ Err(fault)    → snapshot marked corrupted, FAIL
//! ```
//!
//! Validation failures are business outcomes. Apply-phase failures are
//! faults: the plan was already validated, so anything going wrong while
//! writing it leaves the layer unusable and it is marked corrupted.
//!
//! The engine never creates or folds layers itself; [`crate::service`]
//! wraps every call in a provisional layer.

pub mod dvp;
pub mod exchange;
pub mod nominate;

use crate::domain::{
    AddressEntry, CommitData, ContractData, ContractFamily, EventKind, LedgerTx, LifeCycleKind, SettlementError,
    StateSnapshot, TxEnvelope,
};
use crate::ports::MathEvaluator;
use ledger_telemetry::{log_contract_event, log_tx_event, subsystems};
use shared_types::{AddressType, Balance, Checked, MessageHasher, Outcome, SignatureVerifier, Timestamp, TxType};
use sl_03_poa::{
    check_address_permissions, check_poa_address_permissions, check_poa_transaction_permissions, consume_poa_grant,
    PoaGrant, PoaRequest,
};

/// Returned for transactions addressed to another chain.
pub const OTHER_CHAIN_MESSAGE: &str = "Transaction for another chain ignored.";

/// Message when the author's key does not derive the author's address.
pub(crate) const FROM_KEY_MISMATCH: &str = "`From` Address and Public key do not match.";

/// Injected services every family needs.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub verifier: &'a dyn SignatureVerifier,
    pub hasher: &'a dyn MessageHasher,
    pub math: &'a dyn MathEvaluator,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        verifier: &'a dyn SignatureVerifier,
        hasher: &'a dyn MessageHasher,
        math: &'a dyn MathEvaluator,
    ) -> Self {
        Self {
            verifier,
            hasher,
            math,
        }
    }

    /// Address a plain key controls, `None` if the key is not valid.
    pub(crate) fn derived_address(&self, public_key: &str) -> Option<String> {
        if public_key.is_empty() {
            return None;
        }
        self.verifier
            .public_key_to_address(public_key, AddressType::Normal, None)
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Validate and (unless `check_only`) apply one transaction.
pub fn apply_tx(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &LedgerTx,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let envelope = tx.envelope();
    if envelope.chain_id != snapshot.config().chain_id {
        return Outcome::pass(OTHER_CHAIN_MESSAGE);
    }
    if !snapshot.config().tx_age_ok(envelope.timestamp, now) {
        return Outcome::fail("Tx Timestamp invalid.");
    }

    match tx {
        LedgerTx::NewContract(new_tx) => match &new_tx.contract {
            ContractData::Dvp(contract) => dvp::new_contract(ctx, snapshot, new_tx, contract, now, check_only),
            ContractData::Exchange(contract) => {
                exchange::new_contract(ctx, snapshot, new_tx, contract, now, check_only)
            }
            ContractData::TokensNominate(contract) => {
                nominate::new_contract(ctx, snapshot, new_tx, contract, now, check_only)
            }
        },
        LedgerTx::Commit(commit_tx) => match &commit_tx.commitment {
            CommitData::Dvp(commit) => dvp::commit(ctx, snapshot, commit_tx, commit, now, check_only),
            CommitData::Exchange(commit) => exchange::commit(ctx, snapshot, commit_tx, commit, now, check_only),
            CommitData::Nominate(commit) => nominate::commit(ctx, snapshot, commit_tx, commit, now, check_only),
        },
    }
}

/// Run a settlement attempt or a time event for one contract.
pub fn process_event(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    address: &str,
    kind: EventKind,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let Some(family) = snapshot.contracts.find(address).map(|entry| entry.family()) else {
        let message = format!("Contract {address} not found.");
        return if check_only {
            Outcome::warning(message)
        } else {
            Outcome::pass(message)
        };
    };

    match (family, kind) {
        (ContractFamily::Dvp, EventKind::Commit) => dvp::settlement_event(ctx, snapshot, address, now, check_only),
        (ContractFamily::Dvp, EventKind::Time) => dvp::time_event(ctx, snapshot, address, now, check_only),
        // Standing offers settle inside their commit transactions.
        (_, EventKind::Commit) => Outcome::pass(""),
        (_, EventKind::Time) => expiry_event(snapshot, address, now, check_only),
    }
}

// =============================================================================
// SHARED CHECKS
// =============================================================================

/// Author key, POA address and permission checks shared by every
/// transaction.
///
/// Under POA the attorney needs the exercise permission and the grantor
/// needs `required`; those checks only bind a real application. Without POA
/// the author needs `required` when permissioning by address is enabled.
pub(crate) fn check_author(
    ctx: &Collaborators<'_>,
    snapshot: &StateSnapshot,
    envelope: &TxEnvelope,
    base: TxType,
    required: u64,
    key_mismatch: &str,
    check_only: bool,
) -> Checked<()> {
    if !ctx.verifier.verify(
        &envelope.authoring_address,
        &envelope.authoring_public_key,
        AddressType::Normal,
    ) {
        return Err(Outcome::fail(key_mismatch));
    }

    match &envelope.poa {
        Some(poa) => {
            if !ctx.verifier.verify_address(&poa.address) {
                return Err(Outcome::fail(format!("Invalid POA address {}", poa.address)));
            }
            let permitted = check_poa_address_permissions(
                snapshot,
                &envelope.authoring_address,
                &poa.address,
                envelope.tx_type(base),
                base,
                required,
            );
            match permitted {
                Err(denied) if !check_only => Err(denied),
                _ => Ok(()),
            }
        }
        None if snapshot.config().authorise_by_address => {
            check_address_permissions(snapshot, &envelope.authoring_address, base, required)
                .map_err(|denied| Outcome::fail_or_warn(check_only, denied.message))
        }
        None => Ok(()),
    }
}

/// Check the POA grant covering `assets` for `amount`, `None` for a
/// transaction that is not POA authored.
pub(crate) fn check_poa_grant(
    snapshot: &mut StateSnapshot,
    envelope: &TxEnvelope,
    base: TxType,
    assets: &[&str],
    amount: Balance,
    now: Timestamp,
    check_only: bool,
) -> Checked<Option<PoaGrant>> {
    let Some(poa) = &envelope.poa else {
        return Ok(None);
    };
    let request = PoaRequest {
        poa_address: &poa.address,
        reference: &poa.reference,
        attorney: &envelope.authoring_address,
        tx_type: base,
        assets,
        amount,
    };
    check_poa_transaction_permissions(&mut snapshot.poas, now, &request, check_only).map(Some)
}

/// Consume `amount` from every grant collected during validation.
pub(crate) fn consume_grants(
    snapshot: &mut StateSnapshot,
    grants: &[PoaGrant],
    amount: Balance,
    now: Timestamp,
) -> Result<(), SettlementError> {
    for grant in grants {
        consume_poa_grant(&mut snapshot.poas, grant, amount, now)?;
    }
    Ok(())
}

/// Is the namespace or the asset locked?
pub(crate) fn lock_message(snapshot: &StateSnapshot, namespace: &str, asset_id: &str) -> Option<String> {
    if snapshot.is_asset_locked(namespace) {
        Some(format!("Namespace is locked : {namespace}"))
    } else if snapshot.is_asset_locked(asset_id) {
        Some(format!("Asset `{asset_id}` is locked."))
    } else {
        None
    }
}

// =============================================================================
// APPLY HELPERS
// =============================================================================

/// Turn the result of an apply phase into an outcome. A fault marks the
/// snapshot corrupted.
pub(crate) fn applied(
    snapshot: &mut StateSnapshot,
    cause: &str,
    result: Result<Outcome, SettlementError>,
) -> Outcome {
    match result {
        Ok(outcome) => outcome,
        Err(fault) => {
            log_tx_event!(
                error,
                subsystems::CONTRACTS,
                "Apply phase failed, snapshot corrupted",
                cause,
                error = %fault
            );
            snapshot.set_corrupted(format!("{cause}: {fault}"));
            Outcome::fail(format!("State corrupted while applying {cause} : {fault}"))
        }
    }
}

pub(crate) fn balance_of(snapshot: &StateSnapshot, address: &str, asset_id: &str) -> Balance {
    snapshot
        .balances
        .find(address)
        .map(|entry| entry.balance(asset_id))
        .unwrap_or(Balance::ZERO)
}

/// Add `delta` to a holding, creating the address when it is not in state.
pub(crate) fn adjust_balance(
    snapshot: &mut StateSnapshot,
    address: &str,
    asset_id: &str,
    delta: Balance,
) -> Result<Balance, SettlementError> {
    if !snapshot.balances.item_exists(address) {
        snapshot.balances.add(AddressEntry::new(address));
    }
    let height = snapshot.height();
    let entry = snapshot
        .balances
        .find_and_mark_updated(address)
        .ok_or_else(|| SettlementError::missing("address", address))?;
    entry.update_height = height;
    Ok(entry.adjust_balance(asset_id, delta)?)
}

/// Replace a contract's scheduled time and announce the change.
pub(crate) fn reschedule(
    snapshot: &mut StateSnapshot,
    address: &str,
    next: Option<Timestamp>,
) -> Result<(), SettlementError> {
    let entry = snapshot
        .contracts
        .find_and_mark_updated(address)
        .ok_or_else(|| SettlementError::missing("contract", address))?;
    let previous = std::mem::replace(&mut entry.header.next_time_event, next);
    if previous != next {
        if let Some(at) = previous {
            snapshot.remove_event_time(address, at);
        }
        if let Some(at) = next {
            snapshot.add_event_time(address, at);
        }
    }
    Ok(())
}

/// Record the last status message on a contract.
pub(crate) fn record_status(snapshot: &mut StateSnapshot, address: &str, status: &str) {
    if let Some(entry) = snapshot.contracts.find_and_mark_updated(address) {
        if entry.header.status != status {
            entry.header.status = status.to_string();
        }
    }
}

/// Move a contract to its terminal state and raise the life-cycle event.
pub(crate) fn conclude(
    snapshot: &mut StateSnapshot,
    address: &str,
    status: &str,
    kind: LifeCycleKind,
) -> Result<(), SettlementError> {
    let entry = snapshot
        .contracts
        .find_and_mark_updated(address)
        .ok_or_else(|| SettlementError::missing("contract", address))?;
    let previous = entry.header.next_time_event;
    let family = entry.family();
    entry.finish(status);
    let participants = entry.participants();

    if let Some(at) = previous {
        snapshot.remove_event_time(address, at);
    }
    snapshot.add_life_cycle_event(kind, address, participants);
    log_contract_event!(info, "Contract concluded", address, family, kind = %kind, status);
    Ok(())
}

/// Time event of a standing offer (Exchange, TokensNominate): expire it once
/// its expiry is reached, otherwise keep it scheduled.
fn expiry_event(snapshot: &mut StateSnapshot, address: &str, now: Timestamp, check_only: bool) -> Outcome {
    let Some(entry) = snapshot.contracts.find(address) else {
        return Outcome::pass("");
    };
    if entry.is_completed() {
        return Outcome::pass("Contract already completed.");
    }
    let expiry = match &entry.data {
        ContractData::Exchange(contract) => contract.expiry,
        ContractData::TokensNominate(contract) => contract.expiry,
        ContractData::Dvp(contract) => contract.expiry,
    };
    if check_only {
        return Outcome::check_only();
    }

    let result = if now >= expiry {
        conclude(snapshot, address, "Expired", LifeCycleKind::Expire).map(|()| Outcome::pass("Expired."))
    } else {
        reschedule(snapshot, address, Some(expiry)).map(|()| Outcome::pass(""))
    };
    applied(snapshot, address, result)
}
