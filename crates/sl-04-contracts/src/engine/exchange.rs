//! # Exchange
//!
//! A standing offer: the issuer publishes input legs it wants and output
//! legs it gives, both in whole blocks. Any committer delivering a whole
//! number of input blocks within the contract's bounds receives the same
//! number of output blocks. Settlement happens inside the commit itself.
//!
//! ```text
//!   committer ── inputs (M × block) ──► issuer
//!   output address ── outputs (M × block) ──► destination
//! ```
//!
//! Output legs bound to an address other than the issuer must carry that
//! address's signature over the leg, given when the contract is created.

use crate::domain::{
    signing, CommitTx, ContractData, ContractEntry, ContractFamily, ExchangeCommitData, ExchangeContract,
    LifeCycleKind, NewContractTx, NominateAsset, SettlementError, StateSnapshot, TxEnvelope,
};
use crate::engine::{
    adjust_balance, applied, check_author, consume_grants, Collaborators, FROM_KEY_MISMATCH,
};
use ledger_telemetry::{log_contract_event, log_tx_event, subsystems};
use shared_types::permissions::{AP_COMMITS, AP_CONTRACTS};
use shared_types::{AssetId, Balance, Checked, Outcome, Timestamp, TxType};
use sl_01_state_store::Layered;
use sl_03_poa::{check_poa_transaction_permissions, PoaCheckGroup, PoaGrant, PoaRequest};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// NEW CONTRACT
// =============================================================================

/// Validated exchange contract ready to store.
#[derive(Debug)]
struct NewExchangePlan {
    contract: ExchangeContract,
    grants: Vec<PoaGrant>,
}

/// Validate and (unless `check_only`) store a new exchange contract.
pub fn new_contract(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &ExchangeContract,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let plan = match validate_new(ctx, snapshot, tx, contract, now, check_only) {
        Ok(plan) => plan,
        Err(outcome) => {
            log_tx_event!(
                debug,
                subsystems::CONTRACTS,
                "Exchange contract rejected",
                tx.envelope.hash,
                reason = %outcome.message
            );
            return outcome;
        }
    };
    if check_only {
        return Outcome::check_only();
    }
    let result = apply_new(snapshot, tx, plan, now);
    applied(snapshot, &tx.envelope.hash, result)
}

fn validate_new(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &ExchangeContract,
    now: Timestamp,
    check_only: bool,
) -> Checked<NewExchangePlan> {
    let envelope = &tx.envelope;
    let hash = envelope.hash.as_str();
    if snapshot.contracts.item_exists(&tx.contract_address) {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!(
                "Contract already exists : Contract {}, Tx Hash {hash}",
                tx.contract_address
            ),
        ));
    }
    check_author(
        ctx,
        snapshot,
        envelope,
        TxType::NewContract,
        AP_CONTRACTS,
        FROM_KEY_MISMATCH,
        check_only,
    )?;
    let issuer = envelope.effective_address();

    if contract.inputs.is_empty() {
        return Err(Outcome::fail(format!("Exchange : No Input Assets specified : Tx Hash {hash}")));
    }
    if contract.outputs.is_empty() {
        return Err(Outcome::fail(format!("Exchange : No Output Assets specified : Tx Hash {hash}")));
    }
    if contract.max_blocks.is_positive() && contract.max_blocks < contract.min_blocks {
        return Err(Outcome::fail(format!("Exchange : Max Blocks < Min blocks : Tx Hash {hash}")));
    }
    if contract.max_blocks.is_negative() {
        return Err(Outcome::fail(format!("Exchange : Max Blocks < Zero : Tx Hash {hash}")));
    }
    if contract.start_date > contract.expiry {
        return Err(Outcome::fail(format!("Exchange : Start Date is after Expiry : Tx Hash {hash}")));
    }
    if contract.expiry < now {
        return Err(Outcome::fail(format!("Exchange : Expiry is before creation time : Tx Hash {hash}")));
    }

    let mut contract = contract.clone();
    // (grantor, reference) -> assets drawn under it.
    let mut poa_groups: BTreeMap<(String, String), BTreeSet<AssetId>> = BTreeMap::new();

    let mut seen_inputs = BTreeSet::new();
    for leg in &contract.inputs {
        let asset_id = leg.asset_id();
        if !is_well_formed(leg) {
            return Err(Outcome::fail(format!(
                "Exchange : Invalid Input Asset : Asset {asset_id}, Blocksize {}, Tx Hash {hash}",
                leg.block_size
            )));
        }
        if !seen_inputs.insert(asset_id.clone()) {
            return Err(Outcome::fail(format!(
                "Exchange : Duplicate Input Asset : Asset {asset_id}, Tx Hash {hash}"
            )));
        }
        if !leg.address.is_empty() && !ctx.verifier.verify_address(&leg.address) {
            return Err(Outcome::fail(format!(
                "Exchange : invalid Input Address : Address {}, Tx Hash {hash}",
                leg.address
            )));
        }
        if envelope.is_poa() {
            poa_groups
                .entry((issuer.to_string(), leg_reference(envelope, leg)))
                .or_default()
                .insert(asset_id);
        }
    }

    let mut seen_outputs = BTreeSet::new();
    for leg in &mut contract.outputs {
        let asset_id = leg.asset_id();
        if !is_well_formed(leg) {
            return Err(Outcome::fail(format!(
                "Exchange : Invalid Output Asset : Asset {asset_id}, Blocksize {}, Tx Hash {hash}",
                leg.block_size
            )));
        }
        let from = if leg.address.is_empty() {
            issuer.to_string()
        } else {
            leg.address.clone()
        };
        let combined = format!("{from}|{asset_id}").to_lowercase();
        if !seen_outputs.insert(combined.clone()) {
            return Err(Outcome::fail(format!(
                "Exchange : Duplicate Output Asset : Asset {combined}, Tx Hash {hash}"
            )));
        }
        if envelope.is_poa() {
            poa_groups
                .entry((from.clone(), leg_reference(envelope, leg)))
                .or_default()
                .insert(asset_id);
        }

        if leg.address.is_empty() || leg.address.eq_ignore_ascii_case(issuer) {
            leg.public_key.clear();
            leg.signature.clear();
            continue;
        }
        if !ctx.verifier.verify_address(&leg.address) {
            return Err(Outcome::fail(format!(
                "Exchange : invalid Output Address : Address {}, Tx Hash {hash}",
                leg.address
            )));
        }
        if !leg.is_signed() {
            return Err(Outcome::fail(format!(
                "Exchange : Unsigned Output for address {} : Tx Hash {hash}",
                leg.address
            )));
        }
        let signer = ctx.derived_address(&leg.public_key);
        let acceptable = signer.as_deref() == Some(leg.address.as_str())
            || (envelope.is_poa() && signer.as_deref() == Some(envelope.authoring_address.as_str()));
        if !acceptable {
            return Err(Outcome::fail(format!(
                "Exchange : Unacceptable PublicKey for Output : Key {}, Tx Hash {hash}",
                leg.public_key
            )));
        }
        let message = signing::nominate_asset_message(ctx.hasher, &tx.contract_address, leg);
        if !ctx.verifier.verify_signature(&message, &leg.public_key, &leg.signature) {
            return Err(Outcome::fail("Exchange : Invalid output signature"));
        }
    }

    let mut grants = Vec::with_capacity(poa_groups.len());
    for ((grantor, reference), assets) in &poa_groups {
        let assets: Vec<&str> = assets.iter().map(String::as_str).collect();
        let request = PoaRequest {
            poa_address: grantor,
            reference,
            attorney: &envelope.authoring_address,
            tx_type: TxType::NewContract,
            assets: &assets,
            amount: Balance::ONE,
        };
        grants.push(check_poa_transaction_permissions(
            &mut snapshot.poas,
            now,
            &request,
            check_only,
        )?);
    }

    Ok(NewExchangePlan { contract, grants })
}

fn apply_new(
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    plan: NewExchangePlan,
    now: Timestamp,
) -> Result<Outcome, SettlementError> {
    let envelope = &tx.envelope;
    let address = tx.contract_address.as_str();
    consume_grants(snapshot, &plan.grants, Balance::ONE, now)?;

    let next = if plan.contract.start_date > now {
        plan.contract.start_date
    } else {
        plan.contract.expiry
    };
    let mut entry = ContractEntry::new(
        address,
        envelope.effective_address(),
        ContractData::Exchange(plan.contract),
    );
    entry.header.next_time_event = Some(next);
    if envelope.is_poa() {
        entry.header.status = format!(
            "POA New Contract, on behalf of {}, entered by Attorney {}, TX {}.",
            envelope.effective_address(),
            envelope.authoring_address,
            envelope.hash
        );
    }
    let participants = entry.participants();

    if !snapshot.contracts.add(entry) {
        return Err(SettlementError::Invariant(format!(
            "contract {address} appeared during apply"
        )));
    }
    snapshot.add_event_time(address, next);
    snapshot.add_life_cycle_event(LifeCycleKind::New, address, participants);

    log_contract_event!(
        info,
        "Exchange contract created",
        address,
        ContractFamily::Exchange,
        tx_hash = %envelope.hash
    );
    Ok(Outcome::pass(""))
}

fn is_well_formed(leg: &NominateAsset) -> bool {
    !leg.namespace.is_empty() && !leg.class_id.is_empty() && leg.block_size.is_positive()
}

/// POA reference a leg is drawn under: its own, else the transaction's.
fn leg_reference(envelope: &TxEnvelope, leg: &NominateAsset) -> String {
    if leg.reference.is_empty() {
        envelope.poa_reference().to_string()
    } else {
        leg.reference.clone()
    }
}

// =============================================================================
// COMMIT
// =============================================================================

/// One balance movement of a validated commit.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transfer {
    from: String,
    to: String,
    asset_id: AssetId,
    amount: Balance,
}

#[derive(Debug)]
struct ExchangeCommitPlan {
    contract_address: String,
    transfers: Vec<Transfer>,
    participants: BTreeSet<String>,
}

/// Validate and (unless `check_only`) settle a commitment against an
/// exchange contract.
///
/// POA draws are consumed in a layer of their own while validating; the
/// layer is folded on success and dropped otherwise.
pub fn commit(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    commitment: &ExchangeCommitData,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let hash = tx.envelope.hash.as_str();
    if let Some(address) = completed_exchange(snapshot, tx) {
        return Outcome::pass(format!("Exchange Commit : Contract `{address}` is completed. TxHash {hash}"));
    }
    snapshot.poas.create_snapshot();
    let validated = validate_commit(ctx, snapshot, tx, commitment, now, check_only);

    let plan = match validated {
        Ok(plan) if !check_only => plan,
        other => {
            if let Err(fault) = snapshot.poas.discard() {
                return applied(snapshot, hash, Err(fault.into()));
            }
            return match other {
                Ok(_) => Outcome::check_only(),
                Err(outcome) => {
                    log_tx_event!(
                        debug,
                        subsystems::CONTRACTS,
                        "Exchange commit rejected",
                        hash,
                        reason = %outcome.message
                    );
                    outcome
                }
            };
        }
    };

    let result = snapshot
        .poas
        .commit()
        .map_err(SettlementError::from)
        .and_then(|()| apply_commit(snapshot, tx, plan));
    applied(snapshot, hash, result)
}

/// Address of the targeted exchange when it has already concluded.
fn completed_exchange<'a>(snapshot: &StateSnapshot, tx: &'a CommitTx) -> Option<&'a str> {
    let address = tx.contract_addresses.first()?;
    snapshot
        .contracts
        .find(address)
        .filter(|entry| entry.exchange().is_some() && entry.is_completed())
        .map(|_| address.as_str())
}

fn validate_commit(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    commitment: &ExchangeCommitData,
    now: Timestamp,
    check_only: bool,
) -> Checked<ExchangeCommitPlan> {
    let envelope = &tx.envelope;
    let hash = envelope.hash.as_str();
    let Some(address) = tx.contract_addresses.first().filter(|address| !address.is_empty()) else {
        return Err(Outcome::fail_or_warn(check_only, "Contract Address must exist"));
    };
    let Some(entry) = snapshot.contracts.find(address) else {
        return Err(Outcome::fail_or_warn(check_only, "Contract Address must exist"));
    };
    let entry = entry.clone();
    check_author(
        ctx,
        snapshot,
        envelope,
        TxType::CommitToContract,
        AP_COMMITS,
        FROM_KEY_MISMATCH,
        check_only,
    )?;

    if !commitment.contract_address.is_empty() && commitment.contract_address != *address {
        return Err(Outcome::fail(
            "Exchange Commit : Commitment and Contract addresses do not match.",
        ));
    }
    let Some(contract) = entry.exchange() else {
        return Err(Outcome::fail(format!(
            "Exchange Commit : Type mismatch, Contract `{address}` type expected is exchange, Commit is {} TxHash {hash}",
            entry.family()
        )));
    };
    if !contract.has_started(now) {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!(
                "Exchange Commit : Contract `{address}` has not yet started. Start {}, Update {now}, TxHash {hash}",
                contract.start_date
            ),
        ));
    }
    if contract.has_expired(now) {
        return Err(Outcome::fail(format!(
            "Exchange Commit : Contract `{address}` has expired. Expiry {}, Update {now}, TxHash {hash}",
            contract.expiry
        )));
    }
    if contract.inputs.is_empty() {
        return Err(Outcome::fail(format!(
            "Exchange Commit : Contract `{address}` has no inputs. TxHash {hash}"
        )));
    }

    let committer = envelope.effective_address();
    let destination = if commitment.to_address.is_empty() {
        committer
    } else {
        commitment.to_address.as_str()
    };
    if destination != committer && !ctx.verifier.verify_address(destination) {
        return Err(Outcome::fail(format!("Invalid Destination address {destination}")));
    }

    // asset id -> (paying address, amount)
    let mut given: BTreeMap<AssetId, (String, Balance)> = BTreeMap::new();
    let mut poa_group = PoaCheckGroup::new();
    for leg in &commitment.assets_in {
        let asset_id = leg.asset_id();
        if given.contains_key(&asset_id) {
            return Err(Outcome::fail(format!(
                "Exchange Commit : Duplicate Input Asset : Asset {asset_id}, Tx Hash {hash}"
            )));
        }
        if !contract.inputs.iter().any(|required| required.asset_id() == asset_id) {
            return Err(Outcome::fail(format!(
                "Exchange Commit : Input Asset not required by Contract : Asset {asset_id}, Tx Hash {hash}"
            )));
        }
        if !leg.amount.is_positive() {
            return Err(Outcome::fail(format!(
                "Exchange Commit : Input Asset amount <= 0 : Asset {asset_id}, Amount {}, Tx Hash {hash}",
                leg.amount
            )));
        }

        let own = leg.address.is_empty() || leg.address == committer;
        let from = if own { committer } else { leg.address.as_str() };
        if !own {
            if !leg.is_signed() {
                return Err(Outcome::fail(format!(
                    "Exchange Commit : Unsigned Input for address {from}, Asset {asset_id} : Tx Hash {hash}"
                )));
            }
            if ctx.derived_address(&leg.public_key).as_deref() != Some(from) {
                return Err(Outcome::fail(format!(
                    "Exchange Commit : Unacceptable PublicKey for Input : Key {}, Tx Hash {hash}",
                    leg.public_key
                )));
            }
            let message = signing::nominate_asset_message(ctx.hasher, address, leg);
            if !ctx.verifier.verify_signature(&message, &leg.public_key, &leg.signature) {
                return Err(Outcome::fail(format!(
                    "Exchange Commit : Invalid input signature : Asset {asset_id}, Tx Hash {hash}"
                )));
            }
        }

        let Some(holder) = snapshot.balances.find(from) else {
            return Err(Outcome::fail_or_warn(
                check_only,
                format!("Exchange Commit : Input address does not exist : Address {from}, Tx Hash {hash}"),
            ));
        };
        let held = holder.balance(&asset_id);
        if held < leg.amount {
            return Err(Outcome::fail_or_warn(
                check_only,
                format!(
                    "Exchange Commit : Insufficient Commitment balance : Address {from}, Asset {asset_id}, Amount {held}, Required {}, Tx Hash {hash}",
                    leg.amount
                ),
            ));
        }
        if own && envelope.is_poa() {
            poa_group
                .add(from, &leg_reference(envelope, leg), &asset_id, leg.amount)
                .map_err(|err| Outcome::fail(err.to_string()))?;
        }
        given.insert(asset_id, (from.to_string(), leg.amount));
    }

    if !poa_group.is_empty() {
        poa_group.check_and_consume(
            &mut snapshot.poas,
            now,
            &envelope.authoring_address,
            TxType::CommitToContract,
        )?;
    }

    let issuer = entry.header.issuing_address.as_str();
    let mut issuing = BTreeSet::new();
    for leg in contract.inputs.iter().chain(&contract.outputs) {
        if check_namespace(snapshot, leg, issuer, hash, check_only)? {
            issuing.insert(leg.namespace.clone());
        }
    }

    let mut transfers = Vec::new();
    let mut participants = BTreeSet::from([issuer.to_string(), committer.to_string()]);
    let mut multiple: Option<i128> = None;
    for required in &contract.inputs {
        let asset_id = required.asset_id();
        let Some((from, amount)) = given.get(&asset_id) else {
            return Err(Outcome::fail(format!(
                "Exchange Commit : Required Input Asset not given : Asset {asset_id}, Tx Hash {hash}"
            )));
        };
        if !required.address.is_empty() && !required.address.eq_ignore_ascii_case(from) {
            return Err(Outcome::fail(format!(
                "Exchange Commit : Input Asset not from required address : Asset {asset_id}, Tx Hash {hash}"
            )));
        }
        let block = required.block_size.value();
        let blocks = match (amount.value().checked_rem(block), amount.value().checked_div(block)) {
            (Some(0), Some(blocks)) => blocks,
            _ => {
                return Err(Outcome::fail(format!(
                    "Exchange Commit : Input Asset amount is not a multiple of the Contract block size : Asset {asset_id}, Amount {amount}, BlockSize {}, Tx Hash {hash}",
                    required.block_size
                )));
            }
        };
        match multiple {
            Some(expected) if expected != blocks => {
                return Err(Outcome::fail(format!(
                    "Exchange Commit : Input Asset does not have the same block size : Asset {asset_id}, Amount {amount}, BlockCount {blocks}, Expected {expected}, Tx Hash {hash}"
                )));
            }
            _ => multiple = Some(blocks),
        }
        participants.insert(from.clone());
        transfers.push(Transfer {
            from: from.clone(),
            to: issuer.to_string(),
            asset_id,
            amount: *amount,
        });
    }

    let blocks = Balance::new(multiple.unwrap_or(0));
    if contract.min_blocks > blocks {
        return Err(Outcome::fail(format!(
            "Exchange Commit : Commitment Input Block count of {blocks} is less than Contract minimum of {} : Tx Hash {hash}",
            contract.min_blocks
        )));
    }
    if contract.max_blocks.is_positive() && contract.max_blocks < blocks {
        return Err(Outcome::fail(format!(
            "Exchange Commit : Commitment Input Block count of {blocks} exceeds Contract limit of {} : Tx Hash {hash}",
            contract.max_blocks
        )));
    }

    for output in &contract.outputs {
        let asset_id = output.asset_id();
        let from = if output.address.is_empty() {
            issuer
        } else {
            output.address.as_str()
        };
        let Some(holder) = snapshot.balances.find(from) else {
            return Err(Outcome::fail_or_warn(
                check_only,
                format!(
                    "Exchange Commit : Output address does not exist or has no balances : Address {from}, Tx Hash {hash}"
                ),
            ));
        };
        let required = output
            .block_size
            .checked_mul(blocks)
            .map_err(|err| Outcome::fail(err.to_string()))?;
        let held = holder.balance(&asset_id);
        let mints = from == issuer && issuing.contains(&output.namespace);
        if !mints && held < required {
            return Err(Outcome::fail(format!(
                "Exchange Commit : Insufficient Contract balance : Address {from}, Asset {asset_id}, Amount {held}, Required {required}, Tx Hash {hash}"
            )));
        }
        participants.insert(from.to_string());
        transfers.push(Transfer {
            from: from.to_string(),
            to: destination.to_string(),
            asset_id,
            amount: required,
        });
    }

    if !snapshot.balances.item_exists(destination) && snapshot.config().must_register {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!(
                "Exchange Commit : Target Address `{destination}` does not exist in state. MustRegister. Tx Hash {hash}"
            ),
        ));
    }
    participants.insert(destination.to_string());

    Ok(ExchangeCommitPlan {
        contract_address: address.clone(),
        transfers,
        participants,
    })
}

/// Lock and registration checks for one contract leg. Returns whether the
/// contract issuer owns the leg's namespace.
fn check_namespace(
    snapshot: &StateSnapshot,
    leg: &NominateAsset,
    issuer: &str,
    hash: &str,
    check_only: bool,
) -> Checked<bool> {
    let asset_id = leg.asset_id();
    if snapshot.is_asset_locked(&leg.namespace) {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!("Exchange Commit : Namespace is locked : {}. Tx Hash {hash}", leg.namespace),
        ));
    }
    if snapshot.is_asset_locked(&asset_id) {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!("Exchange Commit : Asset `{asset_id}` is locked. Tx Hash {hash}"),
        ));
    }
    let Some(namespace) = snapshot.namespaces.find(&leg.namespace) else {
        return Ok(false);
    };
    if namespace.owner != issuer {
        return Ok(false);
    }
    if !namespace.contains_asset(&leg.class_id) {
        return Err(Outcome::fail_or_warn(
            check_only,
            format!(
                "Exchange Commit : Class `{}` is not registered in Namespace `{}`. Tx Hash {hash}",
                leg.class_id, leg.namespace
            ),
        ));
    }
    Ok(true)
}

fn apply_commit(
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    plan: ExchangeCommitPlan,
) -> Result<Outcome, SettlementError> {
    let address = plan.contract_address.as_str();
    for transfer in &plan.transfers {
        let debit = Balance::ZERO.checked_sub(transfer.amount)?;
        adjust_balance(snapshot, &transfer.from, &transfer.asset_id, debit)?;
        adjust_balance(snapshot, &transfer.to, &transfer.asset_id, transfer.amount)?;
    }
    snapshot.add_life_cycle_event(LifeCycleKind::Commit, address, plan.participants);

    log_contract_event!(
        info,
        "Exchange commit settled",
        address,
        ContractFamily::Exchange,
        tx_hash = %tx.envelope.hash,
        transfers = plan.transfers.len()
    );
    Ok(Outcome::pass(""))
}
