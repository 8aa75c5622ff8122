//! # DvP
//!
//! Delivery-versus-payment contracts move through three steps:
//!
//! | Step | Entry point | Result |
//! |------|-------------|--------|
//! | Create | [`new_contract`] | contract stored, settlement requested once fully signed |
//! | Commit | [`commit`] | signatures, parameters and addresses merged into the contract |
//! | Settle | [`settlement_event`] / [`time_event`] | balances moved atomically, or deferred |
//!
//! Amounts may be formulas over the contract's parameters; they are
//! checked for unknown variables on creation and resolved at settlement.

mod commit;
mod new_contract;
mod settle;

pub use commit::commit;
pub use new_contract::new_contract;
pub use settle::{settlement_event, time_event};

use crate::domain::{DvpAmount, DvpContract};
use crate::ports::{MathError, MathEvaluator};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use shared_types::{Balance, Checked, Outcome};
use std::collections::{BTreeMap, BTreeSet};

/// Lower-cased names of every declared parameter.
fn declared_parameters(contract: &DvpContract) -> BTreeSet<String> {
    contract
        .parameters
        .keys()
        .map(|name| name.to_lowercase())
        .collect()
}

/// Variables `expression` uses that are not declared.
fn undeclared_variables(
    math: &dyn MathEvaluator,
    expression: &str,
    declared: &BTreeSet<String>,
) -> Checked<BTreeSet<String>> {
    let used = math
        .variables_within(expression)
        .map_err(|err| Outcome::fail(format!("DVP : Bad formula `{expression}` : {err}")))?;
    Ok(used.difference(declared).cloned().collect())
}

/// Reject a formula amount that refers to undeclared parameters. `context`
/// names the item in the message.
fn check_formula(
    math: &dyn MathEvaluator,
    amount: &DvpAmount,
    declared: &BTreeSet<String>,
    context: &str,
) -> Checked<()> {
    let DvpAmount::Formula(expression) = amount else {
        return Ok(());
    };
    let unknown = undeclared_variables(math, expression, declared)?;
    if unknown.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = unknown.iter().map(String::as_str).collect();
    Err(Outcome::fail(format!(
        "DVP : Bad amount. {context} : Value string contains parameter values that do not exist : [{}]",
        names.join(", ")
    )))
}

/// Resolve an amount against evaluated parameters. Formula results are
/// rounded half away from zero to whole units.
fn resolve_amount(
    math: &dyn MathEvaluator,
    amount: &DvpAmount,
    variables: &BTreeMap<String, Decimal>,
) -> Result<Balance, MathError> {
    match amount {
        DvpAmount::Fixed(value) => Ok(*value),
        DvpAmount::Formula(expression) => {
            let value = math.evaluate(expression, variables)?;
            value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i128()
                .map(Balance::new)
                .ok_or(MathError::Overflow)
        }
    }
}
