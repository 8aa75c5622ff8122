//! Creation of DvP contracts.

use super::{check_formula, declared_parameters};
use crate::domain::{
    signing, ContractData, ContractEntry, ContractFamily, DvpAmount, DvpContract, LifeCycleKind,
    NewContractTx, ParameterValue, SettlementError, StateSnapshot, COMMIT_PHASE, HOLDER_LOCK, ISSUER_LOCK,
};
use crate::engine::{applied, check_author, check_poa_grant, consume_grants, lock_message, Collaborators, FROM_KEY_MISMATCH};
use ledger_telemetry::{log_contract_event, log_tx_event, subsystems};
use shared_types::permissions::AP_CONTRACTS;
use shared_types::{AddressType, Balance, Checked, Outcome, Timestamp, TxType};
use sl_03_poa::PoaGrant;
use std::collections::{BTreeMap, BTreeSet};

/// What a validated new contract writes.
#[derive(Debug)]
struct NewDvpPlan {
    contract: DvpContract,
    grant: Option<PoaGrant>,
    /// Everything needed to settle is already signed.
    ready: bool,
    status: String,
}

/// Running state of one validation.
struct Review<'a, 'c> {
    ctx: &'a Collaborators<'c>,
    tx: &'a NewContractTx,
    now: Timestamp,
    check_only: bool,
    ready: bool,
    status: String,
}

impl Review<'_, '_> {
    /// Under POA, is `value` the grantor's address?
    fn is_poa_address(&self, value: &str) -> bool {
        self.tx
            .envelope
            .poa
            .as_ref()
            .is_some_and(|poa| poa.address == value)
    }

    /// Note something still missing before settlement can be tried.
    fn defer(&mut self, status: impl Into<String>) {
        if self.ready {
            self.ready = false;
            self.status = status.into();
        }
    }
}

/// Validate and (unless `check_only`) store a new DvP contract.
pub fn new_contract(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &DvpContract,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let plan = match validate(ctx, snapshot, tx, contract, now, check_only) {
        Ok(plan) => plan,
        Err(outcome) => {
            log_tx_event!(
                debug,
                subsystems::CONTRACTS,
                "DvP contract rejected",
                tx.envelope.hash,
                reason = %outcome.message
            );
            return outcome;
        }
    };
    if check_only {
        return Outcome::check_only();
    }
    let result = apply(snapshot, tx, plan, now);
    applied(snapshot, &tx.envelope.hash, result)
}

fn validate(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    contract: &DvpContract,
    now: Timestamp,
    check_only: bool,
) -> Checked<NewDvpPlan> {
    if snapshot.contracts.item_exists(&tx.contract_address) {
        return Err(Outcome::fail_or_warn(check_only, "Contract already exists.."));
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
    let grant = check_poa_grant(
        snapshot,
        &tx.envelope,
        TxType::NewContract,
        &[""],
        Balance::ONE,
        now,
        check_only,
    )?;

    let mut contract = contract.clone();
    let name_length = contract
        .encumbrance
        .as_ref()
        .map(|enc| enc.name.len())
        .unwrap_or(0);
    if name_length > snapshot.config().max_encumbrance_name_length {
        return Err(Outcome::fail("Invalid DVP Encumbrance name."));
    }

    let mut review = Review {
        ctx,
        tx,
        now,
        check_only,
        ready: true,
        status: String::new(),
    };
    check_parameters(&mut review, &mut contract)?;
    check_add_encumbrances(&mut review, snapshot, &mut contract)?;
    check_authorisations(&mut review, &mut contract)?;
    check_parties(&mut review, snapshot, &mut contract)?;
    check_dates(&mut review, snapshot, &contract)?;

    Ok(NewDvpPlan {
        contract,
        grant,
        ready: review.ready,
        status: review.status,
    })
}

fn check_parameters(review: &mut Review<'_, '_>, contract: &mut DvpContract) -> Checked<()> {
    let verifier = review.ctx.verifier;
    let tx = review.tx;
    let envelope = &tx.envelope;
    let mut unsigned = false;

    for (name, parameter) in contract.parameters.iter_mut() {
        if parameter.calculation_only {
            if matches!(&parameter.value, ParameterValue::Expression(e) if e.trim().is_empty()) {
                return Err(Outcome::fail(
                    "DVP : Calculation only fields must have some kind of value.",
                ));
            }
            continue;
        }
        if parameter.address.is_empty() {
            return Err(Outcome::fail(
                "DVP : Bad Parameter structure, public key / address, not a string, or zero length",
            ));
        }
        if !verifier.verify_key_or_address(&parameter.address) {
            return Err(Outcome::fail("DVP : Parameter, public key / Address not valid"));
        }
        if !parameter.is_signed() {
            unsigned = true;
            continue;
        }

        let message = signing::parameter_message(
            &tx.contract_address,
            name,
            &parameter.value.to_string(),
            parameter.contract_specific,
        );
        if review.is_poa_address(&parameter.address) {
            if !verifier.verify_signature(&message, &envelope.authoring_public_key, &parameter.signature) {
                return Err(Outcome::fail("DVP : failed parameter signature"));
            }
            parameter.poa_public_key = envelope.authoring_public_key.clone();
        } else if !verifier.verify_signature(&message, &parameter.address, &parameter.signature) {
            return Err(Outcome::fail("DVP : failed parameter sig : (sig,msg,pub) "));
        }
    }

    if unsigned {
        review.defer("Unsigned Parameters");
    }
    Ok(())
}

fn check_add_encumbrances(
    review: &mut Review<'_, '_>,
    snapshot: &mut StateSnapshot,
    contract: &mut DvpContract,
) -> Checked<()> {
    let ctx = review.ctx;
    let tx = review.tx;
    let envelope = &tx.envelope;
    let declared = declared_parameters(contract);
    let encumbrance_specified = contract.uses_encumbrance();

    // Receive legs an unsigned encumbrance may lock.
    let recipients: BTreeSet<String> = if encumbrance_specified {
        contract
            .parties
            .iter()
            .flat_map(|party| party.receive_list.iter())
            .map(|item| format!("{}|{}", item.address, item.asset_id()))
            .collect()
    } else {
        BTreeSet::new()
    };

    let mut unsigned = false;
    for add in contract.add_encumbrances.iter_mut() {
        let reference = add.reference.as_str();
        if reference.eq_ignore_ascii_case(ISSUER_LOCK) || reference.eq_ignore_ascii_case(HOLDER_LOCK) {
            return Err(Outcome::fail(format!(
                "DVP : Bad addEncumbrance reference. May not use reserved name `{reference}`"
            )));
        }
        if add.public_key.is_empty() {
            return Err(Outcome::fail(
                "DVP : Bad addEncumbrance structure, public key / address, not a string, or zero length",
            ));
        }
        if !ctx.verifier.verify_key_or_address(&add.public_key) {
            return Err(Outcome::fail(
                "DVP : Bad addEncumbrance structure, missing or bad public key / address",
            ));
        }
        if add.asset_id.is_empty() {
            return Err(Outcome::fail(
                "DVP : Bad addEncumbrance structure, AssetID, not a string or zero length",
            ));
        }
        if reference.is_empty() {
            return Err(Outcome::fail(
                "DVP : Bad addEncumbrance structure, Reference must not be null or zero length",
            ));
        }
        match &add.amount {
            DvpAmount::Fixed(amount) if !amount.is_positive() => {
                return Err(Outcome::fail(format!(
                    "DVP : Bad addEncumbrance structure, Encumbrance Amount <= Zero. Reference {reference}"
                )));
            }
            DvpAmount::Formula(expression) if expression.trim().is_empty() => {
                return Err(Outcome::fail(format!(
                    "DVP : Bad addEncumbrance structure, Encumbrance Amount is not specified. Reference {reference}"
                )));
            }
            amount => check_formula(ctx.math, amount, &declared, &format!("Reference {reference}"))?,
        }

        if add.is_signed() {
            let message =
                signing::add_encumbrance_message(ctx.hasher, &tx.contract_address, &add.asset_id, reference, &add.amount);
            if review.is_poa_address(&add.public_key) {
                if !ctx
                    .verifier
                    .verify_signature(&message, &envelope.authoring_public_key, &add.signature)
                {
                    return Err(Outcome::fail("DVP : failed addEncumbrance (poa) signature"));
                }
                add.poa_public_key = envelope.authoring_public_key.clone();
                let amount = add.amount.fixed().unwrap_or(Balance::ZERO);
                check_poa_grant(
                    snapshot,
                    envelope,
                    TxType::EncumberAsset,
                    &[add.asset_id.as_str()],
                    amount,
                    review.now,
                    review.check_only,
                )?;
            } else if !ctx
                .verifier
                .verify_signature(&message, &add.public_key, &add.signature)
            {
                return Err(Outcome::fail("DVP : failed addEncumbrance signature"));
            }
            continue;
        }

        let owner = if ctx.verifier.verify_address(&add.public_key) {
            Some(add.public_key.clone())
        } else {
            ctx.derived_address(&add.public_key)
        };
        let locks_own_receipt = owner
            .map(|owner| recipients.contains(&format!("{owner}|{}", add.asset_id)))
            .unwrap_or(false);
        if !(locks_own_receipt && add.beneficiaries.is_empty()) {
            unsigned = true;
        }
    }

    if unsigned {
        review.defer("Unsigned AddEncumbrances");
    }
    Ok(())
}

fn check_authorisations(review: &mut Review<'_, '_>, contract: &mut DvpContract) -> Checked<()> {
    let verifier = review.ctx.verifier;
    let tx = review.tx;
    let envelope = &tx.envelope;
    let mut unsigned = false;

    for authorisation in contract.authorisations.iter_mut() {
        if authorisation.address.is_empty() {
            return Err(Outcome::fail(
                "DVP : Bad Authorisation structure, public key / address, not a string, or zero length",
            ));
        }
        if !verifier.verify_key_or_address(&authorisation.address) {
            return Err(Outcome::fail("DVP : Authorisation, Bad public key / Address"));
        }
        if !authorisation.is_signed() {
            unsigned = true;
            continue;
        }

        let message = signing::authorisation_message(
            &tx.contract_address,
            &authorisation.id,
            authorisation.refused,
            authorisation.contract_specific,
        );
        if review.is_poa_address(&authorisation.address) {
            if !verifier.verify_signature(&message, &envelope.authoring_public_key, &authorisation.signature) {
                return Err(Outcome::fail("DVP : failed authorisation signature"));
            }
            authorisation.poa_public_key = envelope.authoring_public_key.clone();
        } else if !verifier.verify_signature(&message, &authorisation.address, &authorisation.signature) {
            return Err(Outcome::fail(
                "DVP : failed authorisation sig : (contractAddress + authorisationID + `_` + Refused) ",
            ));
        }
    }

    if unsigned {
        review.defer("Unsigned Authorisation");
    }
    Ok(())
}

fn check_parties(
    review: &mut Review<'_, '_>,
    snapshot: &mut StateSnapshot,
    contract: &mut DvpContract,
) -> Checked<()> {
    if contract.parties.is_empty() {
        return Err(Outcome::fail("DVP : No Parties"));
    }
    if !contract.assign_party_ids() {
        return Err(Outcome::fail("DVP : Every party must have a unique identifier"));
    }

    let ctx = review.ctx;
    let verifier = ctx.verifier;
    let tx = review.tx;
    let envelope = &tx.envelope;
    let attorney = envelope.authoring_address.as_str();
    let declared = declared_parameters(contract);
    let encumbrance_specified = contract.uses_encumbrance();
    let max_metadata = snapshot.config().max_payment_metadata_length;
    let mut net: BTreeMap<String, Balance> = BTreeMap::new();

    for party in contract.parties.iter_mut() {
        if !party.sig_address.is_empty() && !verifier.verify_address(&party.sig_address) {
            return Err(Outcome::fail("DVP : bad party address"));
        }
        if !party.public_key.is_empty() && !party.signature.is_empty() {
            if !verifier.verify_signature(&tx.contract_address, &party.public_key, &party.signature) {
                return Err(Outcome::fail("DVP : failed party sig : (sig,msg,pub)"));
            }
            if !verifier.verify(&party.sig_address, &party.public_key, AddressType::Normal) {
                if !envelope.is_poa() {
                    return Err(Outcome::fail(
                        "DVP : Signature Public key does not match the party address.",
                    ));
                }
                if !review.is_poa_address(&party.sig_address)
                    || !verifier.verify(attorney, &party.public_key, AddressType::Normal)
                {
                    return Err(Outcome::fail(
                        "DVP : PoA Invalid party credentials (Party Address or PoA Public Key).",
                    ));
                }
            }
        } else if party.must_sign || (!encumbrance_specified && !party.pay_list.is_empty()) {
            review.defer("Party not signed and no encumbrance or `mustsign`.");
        }

        for item in party.pay_list.iter_mut() {
            let asset_id = item.asset_id();
            match &item.amount {
                DvpAmount::Fixed(amount) => {
                    if amount.is_negative() {
                        return Err(Outcome::fail("DVP : Party payment, negative quantity"));
                    }
                    let slot = net.entry(asset_id.clone()).or_insert(Balance::ZERO);
                    *slot = slot.checked_add(*amount).map_err(|e| Outcome::fail(e.to_string()))?;
                }
                amount => check_formula(ctx.math, amount, &declared, &format!("Party {}", party.id))?,
            }
            if item.metadata.len() > max_metadata {
                return Err(Outcome::fail("DVP : Party metadata length > limit"));
            }
            if item.address.is_empty() && !item.public_key.is_empty() {
                if let Some(derived) = ctx.derived_address(&item.public_key) {
                    item.address = derived;
                }
            }

            if item.address.is_empty() {
                if item.issuance {
                    return Err(Outcome::fail(
                        "DVP : Can't use `Issuance` flag without specifying a payment address.",
                    ));
                }
                if !encumbrance_specified && item.amount.fixed().is_some_and(|a| a.is_positive()) {
                    review.defer("Payment : No Encumbrance, Not Signed, and Amount > 0");
                }
                continue;
            }

            if !verifier.verify_address(&item.address) {
                return Err(Outcome::fail("DVP : Bad payment address"));
            }
            if !item.public_key.is_empty()
                && !verifier.verify(&item.address, &item.public_key, AddressType::Normal)
            {
                if !envelope.is_poa() {
                    return Err(Outcome::fail(
                        "DVP : Pay Item, Address and public key do not match.",
                    ));
                }
                if !review.is_poa_address(&item.address)
                    || !verifier.verify(attorney, &item.public_key, AddressType::Normal)
                {
                    return Err(Outcome::fail(
                        "DVP : Pay Item address does not match Attorney or POA Address.",
                    ));
                }
                check_poa_grant(
                    snapshot,
                    envelope,
                    TxType::NewContract,
                    &[asset_id.as_str()],
                    Balance::ZERO,
                    review.now,
                    review.check_only,
                )?;
            }
            if item.issuance {
                let controls = snapshot
                    .namespaces
                    .find(&item.namespace)
                    .is_some_and(|ns| ns.owner == item.address && ns.contains_asset(&item.class_id));
                if !controls {
                    return Err(Outcome::fail_or_warn(
                        review.check_only,
                        "DVP : PayItem, Specified address does not control the Issuance Namespace.",
                    ));
                }
            }
            if item.is_signed() {
                let message = signing::pay_item_message(ctx.hasher, &tx.contract_address, item);
                if !verifier.verify_signature(&message, &item.public_key, &item.signature) {
                    return Err(Outcome::fail("DVP : Party payment, invalid payment signature"));
                }
            } else if !encumbrance_specified {
                review.defer(format!(
                    "Payment not signed and No Encumbrance : Party {}, Asset {asset_id}",
                    party.id
                ));
            }
        }

        for item in &party.receive_list {
            let asset_id = item.asset_id();
            if let Some(message) = lock_message(snapshot, &item.namespace, &asset_id) {
                return Err(Outcome::fail_or_warn(review.check_only, message));
            }
            match &item.amount {
                DvpAmount::Fixed(amount) => {
                    if amount.is_negative() {
                        return Err(Outcome::fail("DVP : Party receipt negative quantity"));
                    }
                    let slot = net.entry(asset_id).or_insert(Balance::ZERO);
                    *slot = slot.checked_sub(*amount).map_err(|e| Outcome::fail(e.to_string()))?;
                }
                amount => check_formula(ctx.math, amount, &declared, &format!("Party {}", party.id))?,
            }
            if !item.address.is_empty() && !verifier.verify_address(&item.address) {
                return Err(Outcome::fail(format!("DVP : Bad receive address - {}", item.address)));
            }
        }
    }

    // With parameters present amounts may be formulas, so the balance is
    // only known at settlement.
    if contract.parameters.is_empty() && net.values().any(|sum| !sum.is_zero()) {
        return Err(Outcome::fail("DVP : Payments and Receipts do not balance"));
    }
    Ok(())
}

fn check_dates(review: &mut Review<'_, '_>, snapshot: &StateSnapshot, contract: &DvpContract) -> Checked<()> {
    let config = snapshot.config();
    let now = review.now;
    if contract.expiry < now {
        return Err(Outcome::fail("DVP : No or Bad Expiry Date"));
    }
    if contract.start_date - now > config.max_dvp_start_delay {
        return Err(Outcome::fail("DVP : Start Date not soon enough."));
    }
    if contract.start_date > now {
        review.defer("Contract not yet started.");
    }
    if contract.expiry - now.max(contract.start_date) > config.max_dvp_duration {
        return Err(Outcome::fail("DVP : Contract duration too long."));
    }
    Ok(())
}

fn apply(
    snapshot: &mut StateSnapshot,
    tx: &NewContractTx,
    plan: NewDvpPlan,
    now: Timestamp,
) -> Result<Outcome, SettlementError> {
    let envelope = &tx.envelope;
    let address = tx.contract_address.as_str();

    let mut entry = ContractEntry::new(
        address,
        envelope.effective_address(),
        ContractData::Dvp(plan.contract),
    );
    if let Some(grant) = &plan.grant {
        consume_grants(snapshot, std::slice::from_ref(grant), Balance::ONE, now)?;
        entry.header.status = format!(
            "POA New Contract, on behalf of {}, entered by Attorney {}, TX {}.",
            envelope.effective_address(),
            envelope.authoring_address,
            envelope.hash
        );
    }
    let next = entry
        .dvp()
        .and_then(|contract| contract.next_time_event(now, false));
    entry.header.next_time_event = next;
    let participants = entry.participants();

    if !snapshot.contracts.add(entry) {
        return Err(SettlementError::Invariant(format!(
            "contract {address} appeared during apply"
        )));
    }
    if let Some(at) = next {
        snapshot.add_event_time(address, at);
    }
    if plan.ready {
        snapshot.add_contract_event(address, ContractFamily::Dvp, COMMIT_PHASE, "");
    }
    snapshot.add_life_cycle_event(LifeCycleKind::New, address, participants);

    log_contract_event!(
        info,
        "DvP contract created",
        address,
        ContractFamily::Dvp,
        tx_hash = %envelope.hash,
        ready = plan.ready
    );
    Ok(Outcome::pass(plan.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DvpParty, DvpPayItem, DvpReceiveItem, LedgerEvent, StateConfig, TxEnvelope};
    use crate::engine::test_support::*;

    const CONTRACT: &str = "c1";

    fn pay(address: &str, class: &str, amount: i128) -> DvpPayItem {
        DvpPayItem {
            address: address.to_string(),
            namespace: "NS".to_string(),
            class_id: class.to_string(),
            amount: DvpAmount::Fixed(Balance::new(amount)),
            ..Default::default()
        }
    }

    fn receive(address: &str, class: &str, amount: i128) -> DvpReceiveItem {
        DvpReceiveItem {
            address: address.to_string(),
            namespace: "NS".to_string(),
            class_id: class.to_string(),
            amount: DvpAmount::Fixed(Balance::new(amount)),
        }
    }

    fn signed_party(name: &str, pays: Vec<DvpPayItem>, receives: Vec<DvpReceiveItem>) -> DvpParty {
        let pays = pays
            .into_iter()
            .map(|mut item| {
                item.public_key = key(name);
                item.signature = sign(name, &format!("{CONTRACT}|NS|{}|{}", item.class_id, item.amount));
                item
            })
            .collect();
        DvpParty {
            id: String::new(),
            sig_address: name.to_string(),
            public_key: key(name),
            signature: sign(name, CONTRACT),
            must_sign: false,
            pay_list: pays,
            receive_list: receives,
        }
    }

    fn swap() -> DvpContract {
        DvpContract {
            start_date: 0,
            expiry: 10_000,
            parties: vec![
                signed_party("alice", vec![pay("alice", "X", 100)], vec![receive("alice", "Y", 5)]),
                signed_party("bob", vec![pay("bob", "Y", 5)], vec![receive("bob", "X", 100)]),
            ],
            ..Default::default()
        }
    }

    fn tx(contract: DvpContract) -> NewContractTx {
        NewContractTx {
            envelope: TxEnvelope::new("h1", 1, 1_000, "alice", key("alice")),
            contract_address: CONTRACT.to_string(),
            contract: ContractData::Dvp(contract),
        }
    }

    fn run(snapshot: &mut StateSnapshot, contract: DvpContract, check_only: bool) -> Outcome {
        let ctx = collaborators();
        let tx = tx(contract.clone());
        new_contract(&ctx, snapshot, &tx, &contract, 1_000, check_only)
    }

    #[test]
    fn test_fully_signed_contract_requests_settlement() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let outcome = run(&mut snapshot, swap(), false);
        assert!(outcome.is_pass(), "{outcome}");

        let entry = snapshot.contracts.find(CONTRACT).unwrap();
        assert_eq!(entry.header.issuing_address, "alice");
        assert_eq!(entry.header.next_time_event, Some(10_000));
        let ids: Vec<_> = entry.dvp().unwrap().parties.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let requests: Vec<_> = snapshot
            .events
            .iter()
            .filter_map(LedgerEvent::settlement_request)
            .collect();
        assert_eq!(requests, vec![CONTRACT]);
    }

    #[test]
    fn test_check_only_writes_nothing() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let outcome = run(&mut snapshot, swap(), true);
        assert_eq!(outcome, Outcome::check_only());
        assert!(snapshot.contracts.is_empty());
        assert!(snapshot.events.is_empty());
    }

    #[test]
    fn test_duplicate_contract_rejected() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        assert!(run(&mut snapshot, swap(), false).is_pass());
        let again = run(&mut snapshot, swap(), false);
        assert!(again.is_fail());
        assert_eq!(again.message, "Contract already exists..");
        assert!(run(&mut snapshot, swap(), true).is_warning());
    }

    #[test]
    fn test_unbalanced_contract_rejected() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let mut contract = swap();
        contract.parties[1].receive_list[0].amount = DvpAmount::Fixed(Balance::new(99));
        let outcome = run(&mut snapshot, contract, false);
        assert_eq!(outcome.message, "DVP : Payments and Receipts do not balance");
    }

    #[test]
    fn test_unsigned_party_defers_settlement() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let mut contract = swap();
        contract.parties[1].signature.clear();
        contract.parties[1].pay_list[0].signature.clear();
        let outcome = run(&mut snapshot, contract, false);
        assert!(outcome.is_pass());
        assert_eq!(outcome.message, "Party not signed and no encumbrance or `mustsign`.");
        assert!(snapshot
            .events
            .iter()
            .all(|event| event.settlement_request().is_none()));
    }

    #[test]
    fn test_bad_party_signature_rejected() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let mut contract = swap();
        contract.parties[0].signature = sign("alice", "other");
        let outcome = run(&mut snapshot, contract, false);
        assert_eq!(outcome.message, "DVP : failed party sig : (sig,msg,pub)");
    }

    #[test]
    fn test_reserved_encumbrance_reference_rejected() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let mut contract = swap();
        contract.add_encumbrances.push(crate::domain::DvpAddEncumbrance {
            public_key: key("bob"),
            asset_id: "NS|X".to_string(),
            reference: "holder_lock".to_string(),
            amount: DvpAmount::Fixed(Balance::new(1)),
            ..Default::default()
        });
        let outcome = run(&mut snapshot, contract, false);
        assert_eq!(
            outcome.message,
            "DVP : Bad addEncumbrance reference. May not use reserved name `holder_lock`"
        );
    }

    #[test]
    fn test_dates() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        let mut contract = swap();
        contract.expiry = 999;
        assert_eq!(run(&mut snapshot, contract, false).message, "DVP : No or Bad Expiry Date");

        let mut contract = swap();
        contract.expiry = 1_000 + StateConfig::default().max_dvp_duration + 1;
        assert_eq!(run(&mut snapshot, contract, false).message, "DVP : Contract duration too long.");

        let mut contract = swap();
        contract.start_date = 2_000;
        let outcome = run(&mut snapshot, contract, false);
        assert!(outcome.is_pass());
        assert_eq!(outcome.message, "Contract not yet started.");
        assert_eq!(
            snapshot.contracts.find(CONTRACT).unwrap().header.next_time_event,
            Some(2_000)
        );
    }

    #[test]
    fn test_locked_receipt_asset() {
        let mut snapshot = StateSnapshot::new(StateConfig::default());
        snapshot.lock_asset("NS|Y");
        let outcome = run(&mut snapshot, swap(), false);
        assert!(outcome.is_fail());
        assert_eq!(outcome.message, "Asset `NS|Y` is locked.");
        assert!(run(&mut snapshot, swap(), true).is_warning());
    }
}
