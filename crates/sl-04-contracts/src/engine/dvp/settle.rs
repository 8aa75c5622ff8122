//! DvP settlement.
//!
//! A settlement attempt never re-checks signatures; they were verified when
//! they entered the contract. It checks that everything required is present,
//! resolves every amount, builds the list of balance movements and only then
//! moves anything:
//!
//! ```text
//! authorisations ─► add-encumbrance signatures ─► parameters
//!        │
//!        ▼
//! receipts + payments ─► locks ─► encumbrance / free balance ─► per-asset net = 0
//!        │                                   │
//!        ▼                                   ▼ short
//!   move balances                      retry at now + dvp_retry_delay
//!   consume encumbrances
//!   add encumbrances
//!   COMPLETE
//! ```
//!
//! Anything missing defers the contract: PASS while applying, FAIL when only
//! checking.

use super::resolve_amount;
use crate::domain::{
    DvpContract, DvpParameter, DvpParty, LifeCycleKind, ParameterValue, SettlementError, StateSnapshot,
};
use crate::engine::{
    adjust_balance, applied, balance_of, conclude, lock_message, record_status, reschedule, Collaborators,
};
use crate::ports::MathEvaluator;
use ledger_telemetry::log_contract_event;
use rust_decimal::Decimal;
use shared_types::{Address, AssetId, Balance, BalanceError, Checked, Outcome, Timestamp};
use sl_02_encumbrances::{AddMode, AddressEncumbrances, EncumbranceDetail, EncumbranceEntry, Priority};
use std::collections::{BTreeMap, BTreeSet};

type Holding = (Address, AssetId);

/// One balance change. Payments are negative, receipts positive.
#[derive(Debug, Clone)]
struct Movement {
    address: Address,
    asset_id: AssetId,
    amount: Balance,
    /// Encumbrance the payment draws on, and how much of it.
    encumbrance: Option<String>,
    encumbrance_amount: Balance,
}

/// Encumbrance placed on a holder once the contract completes.
#[derive(Debug, Clone)]
struct Lock {
    holder: Address,
    asset_id: AssetId,
    reference: String,
    amount: Balance,
    beneficiaries: Vec<EncumbranceDetail>,
    administrators: Vec<EncumbranceDetail>,
}

#[derive(Debug)]
struct SettlementPlan {
    movements: Vec<Movement>,
    locks: Vec<Lock>,
    /// Contract-specific encumbrance to release from the payers.
    contract_encumbrance: Option<String>,
}

#[derive(Debug)]
enum Evaluation {
    Finished(Outcome),
    Shortfall(String),
    Ready(SettlementPlan),
}

/// Try to settle a DvP contract.
pub fn settlement_event(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    address: &str,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let evaluation = match snapshot.contracts.find(address) {
        None => return Outcome::fail_or_warn(check_only, format!("Contract {address} not found.")),
        Some(entry) => match entry.dvp() {
            None => {
                return Outcome::fail(format!(
                    "DVP event fed contract of type {} : {address}",
                    entry.family()
                ))
            }
            Some(_) if entry.is_completed() => Ok(Evaluation::Finished(Outcome::pass("Completed."))),
            Some(contract) => {
                let issuer = entry.header.issuing_address.as_str();
                Evaluator::new(ctx, snapshot, address, issuer, now, check_only).evaluate(contract)
            }
        },
    };

    let outcome = match evaluation {
        Err(outcome) | Ok(Evaluation::Finished(outcome)) => outcome,
        Ok(Evaluation::Shortfall(detail)) => {
            let outcome = Outcome::deferred(check_only, format!("Insufficient Asset : {detail}"));
            if check_only {
                outcome
            } else {
                let retry_at = now + snapshot.config().dvp_retry_delay;
                let result = reschedule(snapshot, address, Some(retry_at)).map(|()| outcome);
                applied(snapshot, address, result)
            }
        }
        Ok(Evaluation::Ready(_)) if check_only => Outcome::check_only(),
        Ok(Evaluation::Ready(plan)) => {
            let result = settle(snapshot, address, plan);
            applied(snapshot, address, result)
        }
    };

    if !check_only && !snapshot.is_corrupted() {
        record_status(snapshot, address, &outcome.message);
    }
    outcome
}

/// Time event of a DvP contract: expire it, or re-evaluate it.
pub fn time_event(
    ctx: &Collaborators<'_>,
    snapshot: &mut StateSnapshot,
    address: &str,
    now: Timestamp,
    check_only: bool,
) -> Outcome {
    let Some(entry) = snapshot.contracts.find(address) else {
        return Outcome::pass("Ghost time update.");
    };
    if entry.is_completed() {
        return Outcome::pass("Contract already completed.");
    }
    let Some(contract) = entry.dvp() else {
        return Outcome::fail(format!("DVP event fed contract of type {} : {address}", entry.family()));
    };

    if now >= contract.expiry {
        if check_only {
            return Outcome::check_only();
        }
        let payers = payer_holdings(contract);
        let contract_encumbrance = contract_specific_encumbrance(contract, address);
        let result = release_contract_encumbrance(snapshot, contract_encumbrance.as_deref(), payers)
            .and_then(|()| conclude(snapshot, address, "Expired", LifeCycleKind::Expire))
            .map(|()| Outcome::pass("Expired."));
        return applied(snapshot, address, result);
    }

    if !check_only {
        let next = contract.next_time_event(now, false);
        if let Err(fault) = reschedule(snapshot, address, next) {
            return applied(snapshot, address, Err(fault));
        }
    }
    settlement_event(ctx, snapshot, address, now, check_only)
}

// =============================================================================
// EVALUATION
// =============================================================================

struct Evaluator<'a> {
    ctx: &'a Collaborators<'a>,
    snapshot: &'a StateSnapshot,
    address: &'a str,
    issuer: &'a str,
    now: Timestamp,
    check_only: bool,
    /// Amounts received by this contract, usable by its own payments.
    receipts: BTreeMap<Holding, Balance>,
    /// Holding net of encumbrances and earlier payments.
    free: BTreeMap<Holding, Balance>,
    holdings: BTreeMap<Holding, Balance>,
    /// What is left of each encumbrance a payment draws on.
    encumbrances: BTreeMap<(Address, AssetId, String), Option<Balance>>,
    movements: Vec<Movement>,
}

impl<'a> Evaluator<'a> {
    fn new(
        ctx: &'a Collaborators<'a>,
        snapshot: &'a StateSnapshot,
        address: &'a str,
        issuer: &'a str,
        now: Timestamp,
        check_only: bool,
    ) -> Self {
        Self {
            ctx,
            snapshot,
            address,
            issuer,
            now,
            check_only,
            receipts: BTreeMap::new(),
            free: BTreeMap::new(),
            holdings: BTreeMap::new(),
            encumbrances: BTreeMap::new(),
            movements: Vec::new(),
        }
    }

    fn defer(&self, message: impl Into<String>) -> Outcome {
        Outcome::deferred(self.check_only, message)
    }

    fn arithmetic(&self, err: BalanceError) -> Outcome {
        self.defer(format!("Contract {}, arithmetic failure : {err}", self.address))
    }

    fn evaluate(mut self, contract: &DvpContract) -> Checked<Evaluation> {
        if contract.start_date > self.now {
            return Ok(Evaluation::Finished(Outcome::pass("Contract not yet started.")));
        }
        self.check_signed(contract)?;
        let variables = evaluate_parameters(self.ctx.math, self.address, contract)
            .map_err(|message| self.defer(message))?;

        let mut shortfall = None;
        for party in &contract.parties {
            self.check_party_signed(contract, party)?;
            self.add_receipts(party, &variables)?;
            if shortfall.is_none() {
                shortfall = self.add_payments(contract, party, &variables)?;
            }
            if shortfall.is_some() {
                break;
            }
        }

        let locks = self.resolve_locks(contract, &variables)?;
        if let Some(detail) = shortfall {
            return Ok(Evaluation::Shortfall(detail));
        }
        self.check_balanced()?;

        Ok(Evaluation::Ready(SettlementPlan {
            movements: self.movements,
            locks,
            contract_encumbrance: contract_specific_encumbrance(contract, self.address),
        }))
    }

    /// Authorisations, beneficiary add-encumbrances and parameters must all
    /// be signed.
    fn check_signed(&self, contract: &DvpContract) -> Checked<()> {
        for authorisation in &contract.authorisations {
            if !authorisation.is_signed() {
                return Err(self.defer(format!("Unsigned Authorisation : {}", authorisation.id)));
            }
            if authorisation.refused {
                return Err(self.defer(format!("Authorisation refused : {}", authorisation.id)));
            }
        }
        if let Some(add) = contract
            .add_encumbrances
            .iter()
            .find(|add| !add.beneficiaries.is_empty() && !add.is_signed())
        {
            return Err(self.defer(format!("Unsigned AddEncumbrance : {}", add.reference)));
        }
        if let Some((name, _)) = contract
            .parameters
            .iter()
            .find(|(_, parameter)| !parameter.calculation_only && !parameter.is_signed())
        {
            return Err(self.defer(format!("Unsigned Parameter : {name}")));
        }
        Ok(())
    }

    /// An unsigned party is only acceptable when it need not sign and its
    /// payments, if any, are covered by the contract encumbrance.
    fn check_party_signed(&self, contract: &DvpContract, party: &DvpParty) -> Checked<()> {
        if party.is_signed() {
            return Ok(());
        }
        if party.must_sign {
            return Err(self.defer(format!("Party not signed (must sign) : {}", party.id)));
        }
        if !contract.uses_encumbrance() && !party.pay_list.is_empty() {
            return Err(self.defer(format!("Party not signed (has payments) : {}", party.id)));
        }
        Ok(())
    }

    fn add_receipts(&mut self, party: &DvpParty, variables: &BTreeMap<String, Decimal>) -> Checked<()> {
        for receipt in &party.receive_list {
            let asset_id = receipt.asset_id();
            if let Some(message) = lock_message(self.snapshot, &receipt.namespace, &asset_id) {
                return Err(self.defer(message));
            }
            let quantity = resolve_amount(self.ctx.math, &receipt.amount, variables)
                .map_err(|_| {
                    self.defer(format!(
                        "Contract {}, Party {}, Asset {asset_id}, Failed to evaluate receipt : {}",
                        self.address, party.id, receipt.amount
                    ))
                })?
                .abs();
            if quantity.is_zero() {
                continue;
            }
            if receipt.address.is_empty() {
                return Err(self.defer(format!(
                    "Receipt has no Address : Party {}, Asset {asset_id}",
                    party.id
                )));
            }

            let key = (receipt.address.clone(), asset_id.clone());
            let received = self.receipts.get(&key).copied().unwrap_or(Balance::ZERO);
            let received = received.checked_add(quantity).map_err(|err| self.arithmetic(err))?;
            self.receipts.insert(key, received);
            self.movements.push(Movement {
                address: receipt.address.clone(),
                asset_id,
                amount: quantity,
                encumbrance: None,
                encumbrance_amount: Balance::ZERO,
            });
        }
        Ok(())
    }

    /// Record the party's payments. Returns the shortfall that stops
    /// settlement for now, if any.
    fn add_payments(
        &mut self,
        contract: &DvpContract,
        party: &DvpParty,
        variables: &BTreeMap<String, Decimal>,
    ) -> Checked<Option<String>> {
        let contract_encumbrance = contract.encumbrance_name(self.address);

        for payment in &party.pay_list {
            let asset_id = payment.asset_id();
            let encumbrance_name = contract_encumbrance.map(|name| {
                if payment.encumbrance.is_empty() {
                    name.to_string()
                } else {
                    payment.encumbrance.clone()
                }
            });

            if payment.address.is_empty() {
                return Err(self.defer(format!(
                    "Payment has no Address : Party {}, Asset {asset_id}",
                    party.id
                )));
            }
            if lock_message(self.snapshot, &payment.namespace, &asset_id).is_some() {
                return Err(self.defer(format!(
                    "Payment Asset locked : Party {}, Asset {asset_id}",
                    party.id
                )));
            }
            let quantity = resolve_amount(self.ctx.math, &payment.amount, variables)
                .map_err(|_| {
                    self.defer(format!(
                        "Contract {}, Party {}, Asset {asset_id}, Failed to evaluate payment : {}",
                        self.address, party.id, payment.amount
                    ))
                })?
                .abs();
            if quantity.is_zero() {
                continue;
            }

            let key = (payment.address.clone(), asset_id.clone());
            let holding = self.holding(&key)?;
            let signed = payment.is_signed();
            if contract_encumbrance.is_none() && !signed {
                return Err(self.defer(format!(
                    "Payment not signed : Party {}, Asset {asset_id}",
                    party.id
                )));
            }

            let mut movement = Movement {
                address: payment.address.clone(),
                asset_id: asset_id.clone(),
                amount: Balance::ZERO.checked_sub(quantity).map_err(|err| self.arithmetic(err))?,
                encumbrance: None,
                encumbrance_amount: Balance::ZERO,
            };

            let remaining = match &encumbrance_name {
                Some(name) => self.encumbrance_left(&key, name, holding, payment.issuance)?,
                None => None,
            };

            let shortfall = match (remaining, encumbrance_name) {
                (None, _) if !signed => {
                    return Err(self.defer(format!(
                        "Payment is not signed and no Encumbrance (or expired or not beneficiary) : Address {}, Asset {asset_id}",
                        payment.address
                    )));
                }
                (None, _) => {
                    if payment.issuance {
                        None
                    } else {
                        self.take_free(&key, quantity)?.then(|| {
                            format!(
                                "Asset not available : Address {}, Asset {asset_id}",
                                payment.address
                            )
                        })
                    }
                }
                (Some(left), Some(name)) => {
                    if left.is_positive() {
                        movement.encumbrance = Some(name.clone());
                    }
                    movement.encumbrance_amount = quantity;
                    let mut left = left.checked_sub(quantity).map_err(|err| self.arithmetic(err))?;
                    let mut shortfall = None;

                    if left.is_negative() {
                        let free = self.free.get(&key).copied().unwrap_or(Balance::ZERO);
                        let after = free.checked_add(left).map_err(|err| self.arithmetic(err))?;
                        if signed && !after.is_negative() {
                            // A signed payment tops up from the free holding.
                            self.free.insert(key.clone(), after);
                            movement.encumbrance_amount = movement
                                .encumbrance_amount
                                .checked_add(left)
                                .map_err(|err| self.arithmetic(err))?;
                            left = Balance::ZERO;
                        } else if !signed {
                            return Err(self.defer(format!(
                                "Payment not signed and Encumbrance exhausted : Address {}, Asset {asset_id}, Encumbrance {name}",
                                payment.address
                            )));
                        } else if payment.issuance {
                            return Err(self.defer(format!(
                                "Payment is a signed issuance, but Encumbrance is exhausted : Address {}, Asset {asset_id}, Encumbrance {name}",
                                payment.address
                            )));
                        } else {
                            shortfall = Some(format!(
                                "Payment is signed but Encumbrance exhausted : Address {}, Asset {asset_id}, Encumbrance {name}",
                                payment.address
                            ));
                        }
                    }
                    self.encumbrances
                        .insert((key.0.clone(), key.1.clone(), name), Some(left));
                    shortfall
                }
                (Some(_), None) => None,
            };

            self.movements.push(movement);
            if shortfall.is_some() {
                return Ok(shortfall);
            }
        }
        Ok(None)
    }

    /// Holding of `key` including receipts of this contract. The first look
    /// also seeds the free balance, net of unexpired encumbrances.
    fn holding(&mut self, key: &Holding) -> Checked<Balance> {
        if let Some(holding) = self.holdings.get(key) {
            return Ok(*holding);
        }
        let (address, asset_id) = key;
        let received = self.receipts.get(key).copied().unwrap_or(Balance::ZERO);
        let holding = balance_of(self.snapshot, address, asset_id)
            .checked_add(received)
            .map_err(|err| self.arithmetic(err))?;
        let encumbered = match self
            .snapshot
            .encumbrances
            .find(address)
            .and_then(|entry| entry.asset_encumbrance(asset_id))
        {
            Some(assets) => assets.total_amount(self.now).map_err(|err| self.arithmetic(err))?,
            None => Balance::ZERO,
        };
        let free = holding.checked_sub(encumbered).map_err(|err| self.arithmetic(err))?;
        self.holdings.insert(key.clone(), holding);
        self.free.insert(key.clone(), free);
        Ok(holding)
    }

    /// Take `quantity` from the free balance. Returns `true` when there is
    /// not enough.
    fn take_free(&mut self, key: &Holding, quantity: Balance) -> Checked<bool> {
        let free = self.free.get(key).copied().unwrap_or(Balance::ZERO);
        if free < quantity {
            return Ok(true);
        }
        let left = free.checked_sub(quantity).map_err(|err| self.arithmetic(err))?;
        self.free.insert(key.clone(), left);
        Ok(false)
    }

    /// What is left of the named encumbrance on `key`, ignoring entries that
    /// have expired or do not name the contract issuer as beneficiary. An
    /// issuance draws on the whole encumbrance, anything else only on the
    /// part the holding backs.
    fn encumbrance_left(
        &mut self,
        key: &Holding,
        name: &str,
        holding: Balance,
        issuance: bool,
    ) -> Checked<Option<Balance>> {
        let cache_key = (key.0.clone(), key.1.clone(), name.to_string());
        if let Some(left) = self.encumbrances.get(&cache_key) {
            return Ok(*left);
        }
        let (address, asset_id) = key;
        let aggregate = match self.snapshot.encumbrances.find(address) {
            Some(entry) if issuance => entry.aggregate_by_reference(asset_id, name),
            Some(entry) => entry.aggregate_available_by_reference(asset_id, name, holding),
            None => Ok(None),
        }
        .map_err(|err| self.arithmetic(err))?;

        let left = aggregate
            .filter(|entry| !entry.has_expired(self.now))
            .filter(|entry| entry.is_beneficiary_valid(self.issuer, self.now))
            .map(|entry| entry.amount);
        self.encumbrances.insert(cache_key, left);
        Ok(left)
    }

    /// Resolve add-encumbrances. An unsigned one without beneficiaries is a
    /// lock on the holder's own receipts and must be covered by them.
    fn resolve_locks(&mut self, contract: &DvpContract, variables: &BTreeMap<String, Decimal>) -> Checked<Vec<Lock>> {
        let mut locks = Vec::with_capacity(contract.add_encumbrances.len());
        for add in &contract.add_encumbrances {
            let amount = resolve_amount(self.ctx.math, &add.amount, variables)
                .map_err(|_| self.defer(format!("Bad AddEncumbrance amount string : {}", add.amount)))?;
            let holder = if self.ctx.verifier.verify_address(&add.public_key) {
                add.public_key.clone()
            } else {
                self.ctx.derived_address(&add.public_key).unwrap_or_default()
            };

            if !add.is_signed() {
                let key = (holder.clone(), add.asset_id.clone());
                let received = self.receipts.get(&key).copied().unwrap_or(Balance::ZERO);
                if received < amount {
                    return Err(self.defer(format!("Unsigned AddEncumbrance (lock) : {}", add.reference)));
                }
                let left = received.checked_sub(amount).map_err(|err| self.arithmetic(err))?;
                self.receipts.insert(key, left);
            }

            locks.push(Lock {
                holder,
                asset_id: add.asset_id.clone(),
                reference: add.reference.clone(),
                amount,
                beneficiaries: add.beneficiaries.clone(),
                administrators: add.administrators.clone(),
            });
        }
        Ok(locks)
    }

    fn check_balanced(&self) -> Checked<()> {
        let mut net: BTreeMap<&str, Balance> = BTreeMap::new();
        for movement in &self.movements {
            let sum = net.entry(movement.asset_id.as_str()).or_insert(Balance::ZERO);
            *sum = sum.checked_add(movement.amount).map_err(|err| self.arithmetic(err))?;
        }
        match net.into_iter().find(|(_, sum)| !sum.is_zero()) {
            Some((asset_id, _)) => Err(self.defer(format!(
                "Unbalanced Asset, payments not equal to receipts : {asset_id}"
            ))),
            None => Ok(()),
        }
    }
}

/// Evaluate every parameter in `(calculated_index, name)` order. Later
/// parameters may refer to earlier ones by lower-cased name.
fn evaluate_parameters(
    math: &dyn MathEvaluator,
    address: &str,
    contract: &DvpContract,
) -> Result<BTreeMap<String, Decimal>, String> {
    let mut ordered: Vec<(&String, &DvpParameter)> = contract.parameters.iter().collect();
    ordered.sort_by(|(a_name, a), (b_name, b)| {
        a.calculated_index
            .cmp(&b.calculated_index)
            .then_with(|| a_name.cmp(b_name))
    });

    let mut variables = BTreeMap::new();
    for (name, parameter) in ordered {
        let value = match &parameter.value {
            ParameterValue::Number(value) => Ok(*value),
            ParameterValue::Expression(expression) => math.evaluate(expression, &variables),
        }
        .map_err(|_| format!("Contract {address}, Failed to evaluate parameter {name} : {}", parameter.value))?;
        variables.insert(name.to_lowercase(), value);
    }
    Ok(variables)
}

fn contract_specific_encumbrance(contract: &DvpContract, address: &str) -> Option<String> {
    contract
        .encumbrance_name(address)
        .filter(|name| name.eq_ignore_ascii_case(address))
        .map(str::to_string)
}

fn payer_holdings(contract: &DvpContract) -> BTreeSet<Holding> {
    contract
        .parties
        .iter()
        .flat_map(|party| &party.pay_list)
        .filter(|payment| !payment.address.is_empty())
        .map(|payment| (payment.address.clone(), payment.asset_id()))
        .collect()
}

// =============================================================================
// APPLY
// =============================================================================

fn settle(snapshot: &mut StateSnapshot, address: &str, plan: SettlementPlan) -> Result<Outcome, SettlementError> {
    let SettlementPlan {
        movements,
        locks,
        contract_encumbrance,
    } = plan;
    let (debits, credits): (Vec<Movement>, Vec<Movement>) =
        movements.into_iter().partition(|movement| movement.amount.is_negative());

    for movement in debits.iter().chain(&credits) {
        adjust_balance(snapshot, &movement.address, &movement.asset_id, movement.amount)?;
    }
    for debit in &debits {
        if let Some(name) = &debit.encumbrance {
            consume_encumbrance(snapshot, debit, name)?;
        }
    }

    let payers = debits
        .iter()
        .map(|debit| (debit.address.clone(), debit.asset_id.clone()))
        .collect();
    release_contract_encumbrance(snapshot, contract_encumbrance.as_deref(), payers)?;

    let mut received: BTreeMap<Holding, Balance> = BTreeMap::new();
    for credit in &credits {
        let sum = received
            .entry((credit.address.clone(), credit.asset_id.clone()))
            .or_insert(Balance::ZERO);
        *sum = sum.checked_add(credit.amount)?;
    }
    for lock in locks {
        add_lock(snapshot, lock, &mut received)?;
    }

    conclude(snapshot, address, "Contract completed", LifeCycleKind::Complete)?;
    log_contract_event!(
        info,
        "DvP settled",
        address,
        crate::domain::ContractFamily::Dvp,
        debits = debits.len(),
        credits = credits.len()
    );
    Ok(Outcome::pass("Contract completed"))
}

fn consume_encumbrance(snapshot: &mut StateSnapshot, debit: &Movement, name: &str) -> Result<(), SettlementError> {
    let height = snapshot.height();
    let Some(entry) = snapshot.encumbrances.find_and_mark_updated(&debit.address) else {
        return Ok(());
    };
    if let Some(assets) = entry.asset_encumbrance_mut(&debit.asset_id) {
        assets.consume_encumbrance(name, debit.encumbrance_amount.abs())?;
    }
    entry.tidy();
    entry.set_update_height(height);
    if entry.is_empty() {
        snapshot.encumbrances.delete(&debit.address);
    }
    Ok(())
}

/// Remove the contract-specific encumbrance from every payer that still
/// holds some of it.
fn release_contract_encumbrance(
    snapshot: &mut StateSnapshot,
    name: Option<&str>,
    payers: BTreeSet<Holding>,
) -> Result<(), SettlementError> {
    let Some(name) = name else {
        return Ok(());
    };
    let height = snapshot.height();
    for (address, asset_id) in payers {
        let held = snapshot
            .encumbrances
            .find(&address)
            .and_then(|entry| entry.asset_encumbrance(&asset_id))
            .is_some_and(|assets| assets.any_by_reference(name).is_some());
        if !held {
            continue;
        }
        let Some(entry) = snapshot.encumbrances.find_and_mark_updated(&address) else {
            continue;
        };
        if let Some(assets) = entry.asset_encumbrance_mut(&asset_id) {
            assets.remove_encumbrance(name)?;
        }
        entry.tidy();
        entry.set_update_height(height);
        if entry.is_empty() {
            snapshot.encumbrances.delete(&address);
        }
    }
    Ok(())
}

/// Place a lock. The part covered by what the holder received in this
/// contract goes ahead of existing encumbrances.
fn add_lock(
    snapshot: &mut StateSnapshot,
    lock: Lock,
    received: &mut BTreeMap<Holding, Balance>,
) -> Result<(), SettlementError> {
    let key = (lock.holder.clone(), lock.asset_id.clone());
    let from_contract = received.get(&key).copied().unwrap_or(Balance::ZERO);

    let (high, normal) = if from_contract.is_positive() {
        let high = from_contract.min(lock.amount);
        let remainder = from_contract.checked_sub(lock.amount)?;
        received.insert(key, remainder);
        let normal = if remainder.is_negative() {
            remainder.abs()
        } else {
            Balance::ZERO
        };
        (high, normal)
    } else {
        (Balance::ZERO, lock.amount)
    };

    if !snapshot.encumbrances.item_exists(&lock.holder) {
        snapshot.encumbrances.add(AddressEncumbrances::new(lock.holder.clone()));
    }
    let height = snapshot.height();
    let entry = snapshot
        .encumbrances
        .find_and_mark_updated(&lock.holder)
        .ok_or_else(|| SettlementError::missing("encumbrances", lock.holder.as_str()))?;

    for (amount, priority) in [(high, Priority::High), (normal, Priority::Normal)] {
        if !amount.is_positive() {
            continue;
        }
        let encumbrance = EncumbranceEntry::new(
            lock.reference.clone(),
            amount,
            lock.beneficiaries.clone(),
            lock.administrators.clone(),
        );
        if !entry.set_encumbrance_entry(&lock.asset_id, encumbrance, priority, AddMode::Cumulative)? {
            return Err(SettlementError::Invariant(format!(
                "Unable to accumulate encumbrance \"{}\".",
                lock.reference
            )));
        }
    }
    entry.set_update_height(height);
    let empty = entry.is_empty();
    if empty {
        snapshot.encumbrances.delete(&lock.holder);
    }
    Ok(())
}
