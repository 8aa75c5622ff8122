//! # Tokens Nominate
//!
//! A standing conversion offer from an issuer: clients hand in whole
//! blocks of the input class and receive the same number of blocks of the
//! output class, both within one namespace. When the issuer owns the
//! namespace the output class is issued, so the issuer's holding may go
//! negative.

use crate::domain::{
    signing, CommitTx, ContractData, ContractEntry, ContractFamily, LifeCycleKind, NewContractTx,
    NominateCommitData, SettlementError, StateSnapshot, TokensNominateContract,
};
use crate::engine::{
    adjust_balance, applied, check_author, check_poa_grant, consume_grants, Collaborators, FROM_KEY_MISMATCH,
};
use ledger_telemetry::{log_contract_event, log_tx_event, subsystems};
use shared_types::permissions::{AP_COMMIT, AP_COMMITS, AP_CONTRACTS};
use shared_types::{Address, Balance, Checked, Outcome, Timestamp, TxType};
use sl_03_poa::PoaGrant;
use std::collections::{BTreeMap, BTreeSet};

/// Key mismatch message of nominate commits.
const AUTHOR_KEY_MISMATCH: &str = "`AuthoringAddress` Address and Public key do not match.";

// =============================================================================
// NEW CONTRACT
// =============================================================================

/// Validate and (unless `check_only`) store a new tokens-nominate contract.
pub fn new_contract(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &TokensNominateContract,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let grant = match validate_new(ctx, snapshot, tx, contract, now, check_only) {
        Ok(grant) => grant,
        Err(outcome) => {
            log_tx_event!(
                debug,
                subsystems::CONTRACTS,
                "Tokens nominate contract rejected",
                tx.envelope.hash,
                reason = %outcome.message
            );
            return outcome;
        }
    };
    if check_only {
        return Outcome::check_only();
    }
    let result = apply_new(snapshot, tx, contract, grant, now);
    applied(snapshot, &tx.envelope.hash, result)
}

fn validate_new(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &TokensNominateContract,
    now: Timestamp,
    check_only: bool,
) -> Checked<Option<PoaGrant>> {
    if snapshot.contracts.item_exists(&tx.contract_address) {
        return Err(Outcome::fail("Contract already exists.."));
    }
    check_author(
        ctx,
        snapshot,
        &tx.envelope,
        TxType::NewContract,
        AP_CONTRACTS,
        FROM_KEY_MISMATCH,
        check_only,
    )?;
    if contract.namespace.is_empty() || contract.input_class.is_empty() || contract.output_class.is_empty() {
        return Err(Outcome::fail("Tokens : Contract Assets are not given"));
    }
    if contract.block_size_in < Balance::ONE || contract.block_size_out < Balance::ONE {
        return Err(Outcome::fail("Tokens : Invalid Block Size"));
    }
    if contract.has_expired(now) {
        return Err(Outcome::fail("Tokens : Contract is past expiry date"));
    }

    let input = contract.input_asset_id();
    let output = contract.output_asset_id();
    check_poa_grant(
        snapshot,
        &tx.envelope,
        TxType::NewContract,
        &[input.as_str(), output.as_str()],
        Balance::ONE,
        now,
        check_only,
    )
}

fn apply_new(
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &TokensNominateContract,
    grant: Option<PoaGrant>,
    now: Timestamp,
) -> Result<Outcome, SettlementError> {
    let envelope = &tx.envelope;
    let address = tx.contract_address.as_str();
    if let Some(grant) = &grant {
        consume_grants(snapshot, std::slice::from_ref(grant), Balance::ONE, now)?;
    }

    let expiry = contract.expiry;
    let mut entry = ContractEntry::new(
        address,
        envelope.effective_address(),
        ContractData::TokensNominate(contract.clone()),
    );
    entry.header.next_time_event = Some(expiry);
    let participants = entry.participants();
    if !snapshot.contracts.add(entry) {
        return Err(SettlementError::Invariant(format!(
            "contract {address} appeared during apply"
        )));
    }
    snapshot.add_event_time(address, expiry);
    snapshot.add_life_cycle_event(LifeCycleKind::New, address, participants);

    log_contract_event!(
        info,
        "Tokens nominate contract created",
        address,
        ContractFamily::TokensNominate,
        tx_hash = %envelope.hash
    );
    Ok(Outcome::pass(""))
}

// =============================================================================
// COMMIT
// =============================================================================

#[derive(Debug)]
struct NominatePlan {
    contract_address: Address,
    issuer: Address,
    contract: TokensNominateContract,
    /// Whole-block input taken from each client.
    inputs: BTreeMap<Address, Balance>,
    grant: Option<PoaGrant>,
}

/// Validate and (unless `check_only`) settle a nominate commitment.
pub fn commit(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    commitment: &NominateCommitData,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let plan = match validate_commit(ctx, snapshot, tx, commitment, now, check_only) {
        Ok(Some(plan)) => plan,
        Ok(None) => return Outcome::pass("Nominate : Contract is completed"),
        Err(outcome) => {
            log_tx_event!(
                debug,
                subsystems::CONTRACTS,
                "Nominate commit rejected",
                tx.envelope.hash,
                reason = %outcome.message
            );
            return outcome;
        }
    };
    if check_only {
        return Outcome::check_only();
    }
    let result = apply_commit(snapshot, tx, plan, now);
    applied(snapshot, &tx.envelope.hash, result)
}

/// Whole blocks of `amount`, returned as the amount they account for.
fn whole_blocks(amount: Balance, block_size: Balance) -> Result<Balance, Outcome> {
    amount
        .checked_div(block_size)
        .and_then(|blocks| blocks.checked_mul(block_size))
        .map_err(|err| Outcome::fail(err.to_string()))
}

fn validate_commit(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    commitment: &NominateCommitData,
    now: Timestamp,
    check_only: bool,
) -> Checked<Option<NominatePlan>> {
    let envelope = &tx.envelope;
    let Some(entry) = tx
        .contract_addresses
        .first()
        .and_then(|address| snapshot.contracts.find(address))
    else {
        return Err(Outcome::fail_or_warn(check_only, "Contract Address must exist"));
    };
    let address = entry.address().to_string();
    let issuer = entry.header.issuing_address.clone();
    let Some(contract) = entry.tokens_nominate().cloned() else {
        return Err(Outcome::fail("Contract type does not match this commit"));
    };
    if entry.is_completed() {
        return Ok(None);
    }
    let required = if envelope.is_poa() { AP_COMMITS } else { AP_COMMIT };
    check_author(
        ctx,
        snapshot,
        envelope,
        TxType::CommitToContract,
        required,
        AUTHOR_KEY_MISMATCH,
        check_only,
    )?;
    if contract.has_expired(now) {
        return Err(Outcome::fail("Nominate : Contract has expired"));
    }
    if commitment.assets_in.is_empty() {
        return Err(Outcome::fail("Nominate : Commitment Assets missing."));
    }

    let mut poa_total = Balance::ZERO;
    if envelope.is_poa() {
        for leg in &commitment.assets_in {
            let taken = whole_blocks(leg.amount, contract.block_size_in)?;
            poa_total = poa_total
                .checked_add(taken)
                .map_err(|err| Outcome::fail(err.to_string()))?;
        }
    }
    let grant = check_poa_grant(
        snapshot,
        envelope,
        TxType::CommitToContract,
        &[address.as_str()],
        poa_total,
        now,
        check_only,
    )?;

    let mut is_issuer = false;
    if let Some(namespace) = snapshot.namespaces.find(&contract.namespace) {
        if namespace.owner == issuer {
            is_issuer = true;
            if !namespace.contains_asset(&contract.output_class) {
                return Err(Outcome::fail_or_warn(
                    check_only,
                    format!(
                        "Class `{}` is not registered in namespace `{}`.",
                        contract.output_class, contract.namespace
                    ),
                ));
            }
        }
    }
    let input_id = contract.input_asset_id();
    let output_id = contract.output_asset_id();
    for locked in [&contract.namespace, &input_id, &output_id] {
        if snapshot.is_asset_locked(locked) {
            let message = if *locked == contract.namespace {
                format!("Namespace is locked : {locked}")
            } else {
                format!("Asset `{locked}` is locked.")
            };
            return Err(Outcome::fail_or_warn(check_only, message));
        }
    }

    if !commitment.contract_address.is_empty() && commitment.contract_address != address {
        return Err(Outcome::fail(
            "Nominate : Commitment and Contract addresses do not match.",
        ));
    }
    if commitment.asset_id() != input_id {
        return Err(Outcome::fail("Nominate : Commitment and Contract Assets do not match."));
    }

    let effective = envelope.effective_address();
    let mut clients = Vec::with_capacity(commitment.assets_in.len());
    for leg in &commitment.assets_in {
        if !leg.amount.is_positive() {
            return Err(Outcome::fail("Nominate : Commitment amount invalid."));
        }
        let own = leg.public_key.is_empty()
            || leg.address.is_empty()
            || leg.address.eq_ignore_ascii_case(effective);
        if own {
            clients.push((effective.to_string(), leg.amount));
            continue;
        }
        if ctx.derived_address(&leg.public_key).as_deref() != Some(leg.address.as_str()) {
            return Err(Outcome::fail("Nominate : Commitment Public key does not match address."));
        }
        let message = signing::asset_in_message(&address, leg, &envelope.authoring_address, envelope.nonce);
        if !ctx.verifier.verify_signature(&message, &leg.public_key, &leg.signature) {
            return Err(Outcome::fail("Nominate : Commitment signature invalid."));
        }
        clients.push((leg.address.clone(), leg.amount));
    }

    let Some(host) = snapshot.balances.find(&issuer) else {
        return Err(Outcome::fail("Nominate : Issuing Address is not in state."));
    };
    let host_output = host.balance(&output_id);

    let mut inputs: BTreeMap<Address, Balance> = BTreeMap::new();
    let mut total_output = Balance::ZERO;
    for (client, amount) in clients {
        let Some(holder) = snapshot.balances.find(&client) else {
            return Err(Outcome::fail_or_warn(check_only, "Nominate : Client Address is not in state."));
        };
        let taken = whole_blocks(amount, contract.block_size_in)?;
        let given = amount
            .checked_div(contract.block_size_in)
            .and_then(|blocks| blocks.checked_mul(contract.block_size_out))
            .map_err(|err| Outcome::fail(err.to_string()))?;
        total_output = total_output
            .checked_add(given)
            .map_err(|err| Outcome::fail(err.to_string()))?;

        let cumulative = inputs
            .get(&client)
            .copied()
            .unwrap_or(Balance::ZERO)
            .checked_add(taken)
            .map_err(|err| Outcome::fail(err.to_string()))?;
        if holder.balance(&input_id) < cumulative {
            return Err(Outcome::fail_or_warn(
                check_only,
                "Nominate : Client address has insufficient asset balance.",
            ));
        }
        inputs.insert(client, cumulative);
    }
    if !is_issuer && host_output < total_output {
        return Err(Outcome::fail_or_warn(
            check_only,
            "Nominate : Issuing address has insufficient asset balance.",
        ));
    }

    Ok(Some(NominatePlan {
        contract_address: address,
        issuer,
        contract,
        inputs,
        grant,
    }))
}

fn apply_commit(
    snapshot: &mut StateSnapshot,
    tx: &CommitTx,
    plan: NominatePlan,
    now: Timestamp,
) -> Result<Outcome, SettlementError> {
    let contract = &plan.contract;
    let input_id = contract.input_asset_id();
    let output_id = contract.output_asset_id();

    let mut total_input = Balance::ZERO;
    let mut total_output = Balance::ZERO;
    for (client, taken) in &plan.inputs {
        let given = taken
            .checked_div(contract.block_size_in)?
            .checked_mul(contract.block_size_out)?;
        adjust_balance(snapshot, client, &input_id, Balance::ZERO.checked_sub(*taken)?)?;
        adjust_balance(snapshot, client, &output_id, given)?;
        total_input = total_input.checked_add(*taken)?;
        total_output = total_output.checked_add(given)?;
    }
    adjust_balance(snapshot, &plan.issuer, &input_id, total_input)?;
    adjust_balance(snapshot, &plan.issuer, &output_id, Balance::ZERO.checked_sub(total_output)?)?;

    if let Some(grant) = &plan.grant {
        consume_grants(snapshot, std::slice::from_ref(grant), total_input, now)?;
    }

    let mut participants: BTreeSet<Address> = plan.inputs.keys().cloned().collect();
    participants.insert(plan.issuer.clone());
    snapshot.add_life_cycle_event(LifeCycleKind::Commit, &plan.contract_address, participants);

    log_contract_event!(
        info,
        "Nominate commit settled",
        plan.contract_address,
        ContractFamily::TokensNominate,
        tx_hash = %tx.envelope.hash,
        input = %total_input,
        output = %total_output
    );
    Ok(Outcome::pass(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AddressEntry, AssetIn, CommitData, NamespaceEntry, StateConfig, TxEnvelope};
    use crate::engine::balance_of;
    use crate::engine::test_support::*;

    const CONTRACT: &str = "n1";

    fn offer() -> TokensNominateContract {
        TokensNominateContract {
            namespace: "NS".to_string(),
            input_class: "RIGHTS".to_string(),
            output_class: "SHARES".to_string(),
            block_size_in: Balance::new(4),
            block_size_out: Balance::new(1),
            expiry: 10_000,
            ..Default::default()
        }
    }

    fn create(snapshot: &mut StateSnapshot, contract: &TokensNominateContract) -> Outcome {
        let ctx = collaborators();
        let tx = NewContractTx {
            envelope: TxEnvelope::new("h1", 0, 1_000, "issuer", key("issuer")),
            contract_address: CONTRACT.to_string(),
            contract: ContractData::TokensNominate(contract.clone()),
        };
        new_contract(&ctx, snapshot, &tx, contract, 1_000, false)
    }

    fn funded() -> StateSnapshot {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        snapshot
            .balances
            .add(AddressEntry::new("issuer").with_balance("NS|SHARES", Balance::new(10)));
        snapshot
            .balances
            .add(AddressEntry::new("bob").with_balance("NS|RIGHTS", Balance::new(20)));
        snapshot
            .balances
            .add(AddressEntry::new("carol").with_balance("NS|RIGHTS", Balance::new(8)));
        assert!(create(&mut snapshot, &offer()).is_pass());
        snapshot
    }

    fn data(assets_in: Vec<AssetIn>) -> NominateCommitData {
        NominateCommitData {
            contract_address: CONTRACT.to_string(),
            namespace: "NS".to_string(),
            class_id: "RIGHTS".to_string(),
            assets_in,
        }
    }

    fn own(amount: i128) -> AssetIn {
        AssetIn {
            amount: Balance::new(amount),
            ..Default::default()
        }
    }

    fn run(snapshot: &mut StateSnapshot, data: NominateCommitData, check_only: bool) -> Outcome {
        let ctx = collaborators();
        let tx = CommitTx::single(
            TxEnvelope::new("h2", 0, 1_000, "bob", key("bob")).with_nonce(3),
            CONTRACT,
            CommitData::Nominate(data.clone()),
        );
        commit(&ctx, snapshot, &tx, &data, 1_000, check_only)
    }

    #[test]
    fn test_new_contract_checks() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let mut contract = offer();
        contract.output_class.clear();
        assert_eq!(create(&mut snapshot, &contract).message, "Tokens : Contract Assets are not given");

        let mut contract = offer();
        contract.block_size_out = Balance::ZERO;
        assert_eq!(create(&mut snapshot, &contract).message, "Tokens : Invalid Block Size");

        let mut contract = offer();
        contract.expiry = 999;
        assert_eq!(create(&mut snapshot, &contract).message, "Tokens : Contract is past expiry date");

        assert!(create(&mut snapshot, &offer()).is_pass());
        let entry = snapshot.contracts.find(CONTRACT).unwrap();
        assert_eq!(entry.header.next_time_event, Some(10_000));
        assert_eq!(create(&mut snapshot, &offer()).message, "Contract already exists..");
    }

    #[test]
    fn test_commit_converts_whole_blocks() {
        let mut snapshot = funded();
        // 10 rights is two blocks of 4; the remainder stays with bob.
        let outcome = run(&mut snapshot, data(vec![own(10)]), false);
        assert!(outcome.is_pass(), "{}", outcome.message);

        assert_eq!(balance_of(&snapshot, "bob", "NS|RIGHTS"), Balance::new(12));
        assert_eq!(balance_of(&snapshot, "bob", "NS|SHARES"), Balance::new(2));
        assert_eq!(balance_of(&snapshot, "issuer", "NS|RIGHTS"), Balance::new(8));
        assert_eq!(balance_of(&snapshot, "issuer", "NS|SHARES"), Balance::new(8));
    }

    #[test]
    fn test_signed_leg_for_another_client() {
        let mut snapshot = funded();
        let mut leg = AssetIn {
            address: "carol".to_string(),
            public_key: key("carol"),
            amount: Balance::new(8),
            signature: String::new(),
        };
        let message = signing::asset_in_message(CONTRACT, &leg, &"bob".to_string(), 3);
        leg.signature = "forged".to_string();
        assert_eq!(
            run(&mut snapshot, data(vec![leg.clone()]), false).message,
            "Nominate : Commitment signature invalid."
        );

        leg.signature = sign("carol", &message);
        assert!(run(&mut snapshot, data(vec![leg]), false).is_pass());
        assert_eq!(balance_of(&snapshot, "carol", "NS|RIGHTS"), Balance::ZERO);
        assert_eq!(balance_of(&snapshot, "carol", "NS|SHARES"), Balance::new(2));
    }

    #[test]
    fn test_cumulative_client_balance() {
        let mut snapshot = funded();
        let outcome = run(&mut snapshot, data(vec![own(12), own(12)]), true);
        assert!(outcome.is_warning());
        assert_eq!(outcome.message, "Nominate : Client address has insufficient asset balance.");
    }

    #[test]
    fn test_host_balance_unless_namespace_owner() {
        let mut snapshot = funded();
        snapshot
            .balances
            .find_and_mark_updated("issuer")
            .unwrap()
            .set_balance("NS|SHARES", Balance::new(1));
        assert_eq!(
            run(&mut snapshot, data(vec![own(8)]), false).message,
            "Nominate : Issuing address has insufficient asset balance."
        );

        snapshot
            .namespaces
            .add(NamespaceEntry::new("NS", "issuer", ["RIGHTS"]));
        assert_eq!(
            run(&mut snapshot, data(vec![own(8)]), false).message,
            "Class `SHARES` is not registered in namespace `NS`."
        );

        snapshot
            .namespaces
            .find_and_mark_updated("NS")
            .unwrap()
            .register_class("SHARES");
        assert!(run(&mut snapshot, data(vec![own(8)]), false).is_pass());
        assert_eq!(balance_of(&snapshot, "issuer", "NS|SHARES"), Balance::new(-1));
    }

    #[test]
    fn test_commit_rejections() {
        let mut snapshot = funded();
        let mut wrong_asset = data(vec![own(4)]);
        wrong_asset.class_id = "SHARES".to_string();
        assert_eq!(
            run(&mut snapshot, wrong_asset, false).message,
            "Nominate : Commitment and Contract Assets do not match."
        );
        assert_eq!(
            run(&mut snapshot, data(vec![own(0)]), false).message,
            "Nominate : Commitment amount invalid."
        );
        assert_eq!(
            run(&mut snapshot, data(Vec::new()), false).message,
            "Nominate : Commitment Assets missing."
        );

        snapshot.lock_asset("NS");
        assert_eq!(run(&mut snapshot, data(vec![own(4)]), false).message, "Namespace is locked : NS");
        assert_eq!(balance_of(&snapshot, "bob", "NS|RIGHTS"), Balance::new(20));
    }

    #[test]
    fn test_commit_to_expired_contract_changes_nothing() {
        let mut snapshot = funded();
        snapshot.contracts.find_and_mark_updated(CONTRACT).unwrap().finish("Expired");
        let events = snapshot.events.len();

        let outcome = run(&mut snapshot, data(vec![own(8)]), false);
        assert_eq!(outcome, Outcome::pass("Nominate : Contract is completed"));
        assert_eq!(balance_of(&snapshot, "bob", "NS|RIGHTS"), Balance::new(20));
        assert_eq!(balance_of(&snapshot, "bob", "NS|SHARES"), Balance::ZERO);
        assert_eq!(snapshot.events.len(), events);
    }
}
