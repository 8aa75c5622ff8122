//! # Driven Ports (SPI - Outbound)
//!
//! Collaborators injected into the engine.

use crate::domain::{ContractFamily, LifeCycleKind};
use rust_decimal::Decimal;
use shared_types::{Address, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// FORMULA EVALUATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Syntax error at position {position}: {reason}")]
    Syntax { position: usize, reason: String },

    #[error("Unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Numeric overflow")]
    Overflow,
}

/// Evaluates formula-valued amounts.
///
/// Variable names are case-insensitive; implementations report and look
/// them up in lower case.
pub trait MathEvaluator: Send + Sync {
    /// Every variable the expression refers to, lower-cased.
    fn variables_within(&self, expression: &str) -> Result<BTreeSet<String>, MathError>;

    /// Evaluate with the given variable values.
    fn evaluate(&self, expression: &str, variables: &BTreeMap<String, Decimal>) -> Result<Decimal, MathError>;
}

// =============================================================================
// EVENT DELIVERY
// =============================================================================

/// Receives notifications once the state changes that raised them are
/// committed. Fire and forget.
pub trait EventSink {
    fn add_contract_event(&mut self, address: &str, function: ContractFamily, phase: &str, detail: &str);

    fn add_life_cycle_event(&mut self, kind: LifeCycleKind, address: &str, participants: &BTreeSet<Address>);

    fn add_contract_event_time(&mut self, address: &str, at: Timestamp);

    fn remove_contract_event_time(&mut self, address: &str, at: Timestamp);
}
