//! # Error Types
//!
//! Arithmetic errors raised by [`crate::Balance`].

use thiserror::Error;

/// Errors from checked balance arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    /// Result does not fit in the balance representation.
    #[error("Balance overflow in {operation}: {left} and {right}")]
    Overflow {
        operation: &'static str,
        left: i128,
        right: i128,
    },

    /// Division or modulus by zero.
    #[error("Division by zero: {0} / 0")]
    DivisionByZero(i128),

    /// Text is not an integer amount.
    #[error("Invalid balance literal: {0}")]
    InvalidLiteral(String),
}
