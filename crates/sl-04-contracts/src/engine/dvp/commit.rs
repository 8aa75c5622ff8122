//! Commitments to DvP contracts.
//!
//! A commit carries signatures and values for items of an existing
//! contract. Validation checks every signature against the stored contract
//! and merges the commitment into a working copy; the items that differ
//! become the edit list the apply phase writes.

use crate::domain::{
    signing, CommitTx, ContractFamily, DvpAddEncumbrance, DvpAuthorisation, DvpCommitData, DvpContract,
    DvpParameter, DvpParty, LifeCycleKind, PartyCommit, SettlementError, StateSnapshot, TxEnvelope, COMMIT_PHASE,
};
use crate::engine::{
    applied, check_author, check_poa_grant, conclude, consume_grants, Collaborators, FROM_KEY_MISMATCH,
};
use ledger_telemetry::{log_contract_event, log_tx_event, subsystems};
use shared_types::permissions::AP_COMMITS;
use shared_types::{AddressType, Balance, Checked, Outcome, Timestamp, TxType};
use sl_03_poa::PoaGrant;
use std::collections::BTreeSet;

/// One changed item of a contract.
#[derive(Debug, Clone, PartialEq)]
enum DvpEdit {
    Authorisation { index: usize, updated: DvpAuthorisation },
    Parameter { name: String, updated: DvpParameter },
    AddEncumbrance { index: usize, updated: DvpAddEncumbrance },
    Party { index: usize, updated: DvpParty },
}

impl DvpEdit {
    fn apply(self, contract: &mut DvpContract) -> Result<(), SettlementError> {
        let missing = |what: &str| SettlementError::Invariant(format!("DvP {what} vanished during commit"));
        match self {
            DvpEdit::Authorisation { index, updated } => {
                *contract
                    .authorisations
                    .get_mut(index)
                    .ok_or_else(|| missing("authorisation"))? = updated;
            }
            DvpEdit::Parameter { name, updated } => {
                *contract
                    .parameters
                    .get_mut(&name)
                    .ok_or_else(|| missing("parameter"))? = updated;
            }
            DvpEdit::AddEncumbrance { index, updated } => {
                *contract
                    .add_encumbrances
                    .get_mut(index)
                    .ok_or_else(|| missing("add-encumbrance"))? = updated;
            }
            DvpEdit::Party { index, updated } => {
                *contract.parties.get_mut(index).ok_or_else(|| missing("party"))? = updated;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ContractUpdate {
    address: String,
    edits: Vec<DvpEdit>,
    grant: Option<PoaGrant>,
}

#[derive(Debug)]
enum CommitPlan {
    /// Nothing to write.
    Finished(Outcome),
    Cancel { address: String },
    Update(Vec<ContractUpdate>),
}

/// Who is committing: the author, and under POA the grantor.
struct Committer<'a> {
    attorney: &'a str,
    poa: Option<&'a str>,
}

impl<'a> Committer<'a> {
    fn new(envelope: &'a TxEnvelope) -> Self {
        Self {
            attorney: &envelope.authoring_address,
            poa: envelope.poa.as_ref().map(|poa| poa.address.as_str()),
        }
    }

    /// May a commitment signed by `public_key` (controlling `commit_address`)
    /// fill an item currently held by `holder`?
    fn may_fill(&self, holder: &str, public_key: &str, commit_address: &str) -> bool {
        match self.poa {
            Some(poa) => self.attorney.eq_ignore_ascii_case(commit_address) && holder.eq_ignore_ascii_case(poa),
            None => holder.eq_ignore_ascii_case(public_key) || holder.eq_ignore_ascii_case(commit_address),
        }
    }
}

/// Validate and (unless `check_only`) apply a DvP commitment.
pub fn commit(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    commitment: &DvpCommitData,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let plan = match validate(ctx, snapshot, tx, commitment, now, check_only) {
        Ok(plan) => plan,
        Err(outcome) => {
            log_tx_event!(
                debug,
                subsystems::CONTRACTS,
                "DvP commit rejected",
                tx.envelope.hash,
                reason = %outcome.message
            );
            return outcome;
        }
    };
    if let CommitPlan::Finished(outcome) = plan {
        return outcome;
    }
    if check_only {
        return Outcome::check_only();
    }
    let result = apply(snapshot, &tx.envelope, plan, now);
    applied(snapshot, &tx.envelope.hash, result)
}

fn validate(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    commitment: &DvpCommitData,
    now: Timestamp,
    check_only: bool,
) -> Checked<CommitPlan> {
    let envelope = &tx.envelope;
    check_author(
        ctx,
        snapshot,
        envelope,
        TxType::CommitToContract,
        AP_COMMITS,
        FROM_KEY_MISMATCH,
        check_only,
    )?;

    let mut seen = BTreeSet::new();
    let addresses: Vec<&String> = tx
        .contract_addresses
        .iter()
        .filter(|address| seen.insert(address.as_str()))
        .collect();
    if addresses.is_empty() {
        return Err(Outcome::fail_or_warn(check_only, "Contract Address must exist"));
    }
    let single = addresses.len() == 1;
    let committer = Committer::new(envelope);
    let mut updates = Vec::new();

    for address in addresses {
        let Some(entry) = snapshot.contracts.find(address).cloned() else {
            if single {
                return Err(Outcome::fail_or_warn(check_only, "Contract Address must exist"));
            }
            continue;
        };
        let Some(contract) = entry.dvp() else {
            return Err(Outcome::fail("Contract type does not match this commit"));
        };
        if entry.is_completed() {
            if single {
                return Ok(CommitPlan::Finished(Outcome::pass("DVP : Contract is completed")));
            }
            continue;
        }
        let grant = check_poa_grant(
            snapshot,
            envelope,
            TxType::CommitToContract,
            &[address.as_str()],
            Balance::ONE,
            now,
            check_only,
        )?;

        if single {
            if let Some(cancel) = commitment
                .cancel
                .as_ref()
                .filter(|c| !c.public_key.is_empty() && !c.signature.is_empty())
            {
                let issuer = entry.header.issuing_address.as_str();
                let from_author = match committer.poa {
                    Some(grantor) => {
                        grantor == issuer
                            && ctx
                                .verifier
                                .verify(committer.attorney, &cancel.public_key, AddressType::Normal)
                    }
                    None => ctx.verifier.verify(issuer, &cancel.public_key, AddressType::Normal),
                };
                if !from_author {
                    return Err(Outcome::fail(
                        "DVP : Cancel instruction is not from the contract author.",
                    ));
                }
                if !ctx
                    .verifier
                    .verify_signature(address, &cancel.public_key, &cancel.signature)
                {
                    return Err(Outcome::fail("DVP : Cancel Signature not valid "));
                }
                return Ok(CommitPlan::Cancel {
                    address: address.clone(),
                });
            }
        }

        for parameter in &commitment.parameters {
            let message = signing::parameter_message(
                address,
                &parameter.name,
                &parameter.value_text(),
                parameter.contract_specific,
            );
            if !ctx
                .verifier
                .verify_signature(&message, &parameter.public_key, &parameter.signature)
            {
                return Err(Outcome::fail("DVP : Invalid Parameter signature"));
            }
        }
        if commitment.parameters.is_empty() && !single {
            return Err(Outcome::fail(format!(
                "DVP Commit : A commit to multiple addresses must be for setting parameters. Bad TX {}",
                envelope.hash
            )));
        }

        let matched = match &commitment.party {
            Some(party) if single => {
                if !ctx
                    .verifier
                    .verify_signature(address, &party.public_key, &party.signature)
                {
                    return Err(Outcome::fail("DVP : Commit Signature not valid "));
                }
                let matched = match_parties(ctx, contract, party, &committer);
                check_legs(ctx, contract, address, commitment, &matched, &committer)?;
                matched
            }
            _ => Vec::new(),
        };

        for authorisation in &commitment.authorisations {
            let message = signing::authorisation_message(
                address,
                &authorisation.id,
                authorisation.refused,
                authorisation.contract_specific,
            );
            if !ctx
                .verifier
                .verify_signature(&message, &authorisation.public_key, &authorisation.signature)
            {
                return Err(Outcome::fail(format!(
                    "DVP : Invalid signature on authorisation : {}",
                    authorisation.id
                )));
            }
        }
        if single {
            for encumbrance in &commitment.encumbrances {
                let message = signing::add_encumbrance_message(
                    ctx.hasher,
                    address,
                    &encumbrance.asset_id,
                    &encumbrance.reference,
                    &encumbrance.amount,
                );
                if !ctx
                    .verifier
                    .verify_signature(&message, &encumbrance.public_key, &encumbrance.signature)
                {
                    return Err(Outcome::fail("DVP : Invalid Encumbrance signature"));
                }
            }
        }

        let mut working = contract.clone();
        merge_authorisations(ctx, &mut working, commitment, &committer);
        merge_parameters(ctx, &mut working, commitment, &committer);
        if single {
            merge_encumbrances(ctx, &mut working, commitment, &committer);
            if let Some(party) = &commitment.party {
                merge_party(ctx, &mut working, party, commitment, &matched, &committer);
            }
        }
        updates.push(ContractUpdate {
            address: address.clone(),
            edits: diff(contract, working),
            grant,
        });
    }

    Ok(CommitPlan::Update(updates))
}

/// Parties a party commitment signs. Several parties may share a signing
/// address and are then signed together.
fn match_parties(
    ctx: &Collaborators<'_>,
    contract: &DvpContract,
    commit: &PartyCommit,
    committer: &Committer<'_>,
) -> Vec<usize> {
    contract
        .parties
        .iter()
        .enumerate()
        .filter(|(_, party)| {
            let ids_match = party.id == commit.id;
            let sig_match = ctx
                .verifier
                .verify(&party.sig_address, &commit.public_key, AddressType::Normal)
                || committer.poa == Some(party.sig_address.as_str());
            let on_id = ids_match && (sig_match || party.sig_address.is_empty());
            let on_sig = sig_match && (ids_match || party.id.is_empty() || commit.id.is_empty());
            on_id || on_sig
        })
        .map(|(index, _)| index)
        .collect()
}

/// Check payment and receipt commitments against every matched party.
fn check_legs(
    ctx: &Collaborators<'_>,
    contract: &DvpContract,
    address: &str,
    commitment: &DvpCommitData,
    matched: &[usize],
    committer: &Committer<'_>,
) -> Checked<()> {
    for party in matched.iter().filter_map(|&index| contract.parties.get(index)) {
        if !party.pay_list.is_empty() {
            for payment in &commitment.payments {
                let item = party
                    .pay_list
                    .get(payment.index)
                    .ok_or_else(|| Outcome::fail("DVP : No matching payment."))?;
                let pay_address = ctx.derived_address(&payment.public_key).unwrap_or_default();

                if item.address.is_empty() {
                    if committer.poa.is_some() {
                        return Err(Outcome::fail(
                            "DVP : Can not POA Commit to a payment with no payment address.",
                        ));
                    }
                } else if item.address != pay_address {
                    let attorney_for_grantor = committer.poa == Some(item.address.as_str())
                        && committer.attorney == pay_address;
                    if !attorney_for_grantor {
                        return Err(Outcome::fail(
                            "DVP : Payment commitment address does not match payment value. ",
                        ));
                    }
                }

                let message = signing::pay_item_message(ctx.hasher, address, item);
                if !ctx
                    .verifier
                    .verify_signature(&message, &payment.public_key, &payment.signature)
                {
                    return Err(Outcome::fail("DVP : Payment Signature not valid"));
                }
            }
        }

        if !party.receive_list.is_empty() {
            for receipt in &commitment.receipts {
                if receipt.index >= party.receive_list.len() {
                    return Err(Outcome::fail(format!(
                        "DVP : No matching receipt for commit item # {}",
                        receipt.index
                    )));
                }
                if receipt.address.is_empty() {
                    continue;
                }
                if !ctx.verifier.verify_address(&receipt.address) {
                    return Err(Outcome::fail("DVP : Invalid receipt address."));
                }
                if let Some(poa) = committer.poa {
                    if !receipt.address.eq_ignore_ascii_case(poa) {
                        return Err(Outcome::fail(
                            "DVP : POA can not provide payment address except the poa Address.",
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// MERGING
// =============================================================================

fn merge_authorisations(
    ctx: &Collaborators<'_>,
    contract: &mut DvpContract,
    commitment: &DvpCommitData,
    committer: &Committer<'_>,
) {
    for commit in &commitment.authorisations {
        let commit_address = ctx.derived_address(&commit.public_key).unwrap_or_default();
        for authorisation in contract
            .authorisations
            .iter_mut()
            .filter(|a| a.id.eq_ignore_ascii_case(&commit.id))
        {
            if !committer.may_fill(&authorisation.address, &commit.public_key, &commit_address) {
                continue;
            }
            // A contract-specific authorisation needs a contract-specific signature.
            if authorisation.contract_specific && !commit.contract_specific {
                continue;
            }
            match committer.poa {
                Some(poa) => {
                    authorisation.poa_public_key = commit.public_key.clone();
                    authorisation.address = poa.to_string();
                }
                None => authorisation.address = commit.public_key.clone(),
            }
            authorisation.signature = commit.signature.clone();
            authorisation.refused = commit.refused;
            if !commit.metadata.is_empty() {
                authorisation.metadata = commit.metadata.clone();
            }
        }
    }
}

fn merge_parameters(
    ctx: &Collaborators<'_>,
    contract: &mut DvpContract,
    commitment: &DvpCommitData,
    committer: &Committer<'_>,
) {
    for commit in &commitment.parameters {
        let Some(parameter) = contract.parameters.get_mut(&commit.name) else {
            continue;
        };
        if parameter.calculation_only || parameter.address.is_empty() {
            continue;
        }
        let commit_address = ctx.derived_address(&commit.public_key).unwrap_or_default();
        if !committer.may_fill(&parameter.address, &commit.public_key, &commit_address) {
            continue;
        }
        if committer.poa.is_some() {
            parameter.poa_public_key = commit.public_key.clone();
        } else {
            parameter.address = commit.public_key.clone();
        }
        if let Some(value) = &commit.value {
            parameter.value = value.clone();
        }
        parameter.signature = commit.signature.clone();
    }
}

fn merge_encumbrances(
    ctx: &Collaborators<'_>,
    contract: &mut DvpContract,
    commitment: &DvpCommitData,
    committer: &Committer<'_>,
) {
    for commit in &commitment.encumbrances {
        let commit_address = ctx.derived_address(&commit.public_key).unwrap_or_default();
        for add in contract.add_encumbrances.iter_mut().filter(|add| {
            add.asset_id.eq_ignore_ascii_case(&commit.asset_id)
                && add.reference.eq_ignore_ascii_case(&commit.reference)
                && add.amount == commit.amount
        }) {
            if !committer.may_fill(&add.public_key, &commit.public_key, &commit_address) {
                continue;
            }
            if committer.poa.is_some() {
                add.poa_public_key = commit.public_key.clone();
            } else {
                add.public_key = commit.public_key.clone();
            }
            add.signature = commit.signature.clone();
        }
    }
}

fn merge_party(
    ctx: &Collaborators<'_>,
    contract: &mut DvpContract,
    commit: &PartyCommit,
    commitment: &DvpCommitData,
    matched: &[usize],
    committer: &Committer<'_>,
) {
    let sig_address = ctx.derived_address(&commit.public_key).unwrap_or_default();
    for &index in matched {
        let Some(party) = contract.parties.get_mut(index) else {
            continue;
        };
        if party.id.is_empty() {
            party.id = commit.id.clone();
        }
        if !party.is_signed() {
            party.sig_address = sig_address.clone();
            party.public_key = commit.public_key.clone();
            party.signature = commit.signature.clone();
        }

        for payment in &commitment.payments {
            let Some(item) = party.pay_list.get_mut(payment.index) else {
                continue;
            };
            let pay_address = ctx.derived_address(&payment.public_key).unwrap_or_default();
            match committer.poa {
                Some(_) if item.address.is_empty() => continue,
                Some(poa) => {
                    let own = item.address.eq_ignore_ascii_case(&pay_address);
                    let for_grantor = committer.attorney.eq_ignore_ascii_case(&pay_address)
                        && item.address.eq_ignore_ascii_case(poa);
                    if !own && !for_grantor {
                        continue;
                    }
                }
                None => {
                    if !item.address.is_empty() && !item.address.eq_ignore_ascii_case(&pay_address) {
                        continue;
                    }
                    item.address = pay_address;
                }
            }
            item.public_key = payment.public_key.clone();
            item.signature = payment.signature.clone();
        }

        for receipt in &commitment.receipts {
            if let Some(item) = party.receive_list.get_mut(receipt.index) {
                item.address = receipt.address.clone();
            }
        }
    }
}

/// Items of `working` that differ from `original`.
fn diff(original: &DvpContract, working: DvpContract) -> Vec<DvpEdit> {
    let mut edits = Vec::new();
    for (index, updated) in working.authorisations.into_iter().enumerate() {
        if original.authorisations.get(index) != Some(&updated) {
            edits.push(DvpEdit::Authorisation { index, updated });
        }
    }
    for (name, updated) in working.parameters {
        if original.parameters.get(&name) != Some(&updated) {
            edits.push(DvpEdit::Parameter { name, updated });
        }
    }
    for (index, updated) in working.add_encumbrances.into_iter().enumerate() {
        if original.add_encumbrances.get(index) != Some(&updated) {
            edits.push(DvpEdit::AddEncumbrance { index, updated });
        }
    }
    for (index, updated) in working.parties.into_iter().enumerate() {
        if original.parties.get(index) != Some(&updated) {
            edits.push(DvpEdit::Party { index, updated });
        }
    }
    edits
}

// =============================================================================
// APPLY
// =============================================================================

fn apply(
    snapshot: &mut StateSnapshot,
    envelope: &TxEnvelope,
    plan: CommitPlan,
    now: Timestamp,
) -> Result<Outcome, SettlementError> {
    match plan {
        CommitPlan::Finished(outcome) => Ok(outcome),
        CommitPlan::Cancel { address } => {
            let entry = snapshot
                .contracts
                .find_and_mark_updated(&address)
                .ok_or_else(|| SettlementError::missing("contract", address.as_str()))?;
            entry.header.cancel_time = Some(now);
            let status = format!("Cancelled by TX {}", envelope.hash);
            conclude(snapshot, &address, &status, LifeCycleKind::Cancel)?;
            Ok(Outcome::pass("Contract Cancelled"))
        }
        CommitPlan::Update(updates) => {
            for update in updates {
                apply_update(snapshot, envelope, update, now)?;
            }
            Ok(Outcome::pass(""))
        }
    }
}

fn apply_update(
    snapshot: &mut StateSnapshot,
    envelope: &TxEnvelope,
    update: ContractUpdate,
    now: Timestamp,
) -> Result<(), SettlementError> {
    let ContractUpdate { address, edits, grant } = update;
    if let Some(grant) = &grant {
        consume_grants(snapshot, std::slice::from_ref(grant), Balance::ONE, now)?;
    }

    let changed = !edits.is_empty();
    let edit_count = edits.len();
    let entry = snapshot
        .contracts
        .find_and_mark_updated(&address)
        .ok_or_else(|| SettlementError::missing("contract", address.as_str()))?;
    let contract = entry
        .dvp_mut()
        .ok_or_else(|| SettlementError::Invariant(format!("contract {address} is no longer a DvP")))?;
    for edit in edits {
        edit.apply(contract)?;
    }
    if let Some(poa) = &envelope.poa {
        entry.header.status = format!(
            "POA Commit to Contract, on behalf of {}, entered by Attorney {}, TX {}.",
            poa.address, envelope.authoring_address, envelope.hash
        );
    }
    let participants = entry.participants();

    if changed {
        snapshot.add_contract_event(&address, ContractFamily::Dvp, COMMIT_PHASE, "");
    }
    snapshot.add_life_cycle_event(LifeCycleKind::Commit, &address, participants);
    log_contract_event!(
        debug,
        "DvP commitment applied",
        address,
        ContractFamily::Dvp,
        tx_hash = %envelope.hash,
        edits = edit_count
    );
    Ok(())
}
