//! # Transaction Outcomes
//!
//! Every public settlement operation answers with an [`Outcome`]:
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `Pass` | Accepted (or a legal no-op). |
//! | `Warning` | Check-only run hit a condition that may resolve once earlier transactions land. |
//! | `Fail` | Rejected, no state change. |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned by a successful check-only run.
pub const CHECK_ONLY_MESSAGE: &str = "Check Only.";

/// Three-valued result of a transaction check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuccessType {
    Pass,
    Warning,
    Fail,
}

impl fmt::Display for SuccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessType::Pass => f.write_str("PASS"),
            SuccessType::Warning => f.write_str("WARNING"),
            SuccessType::Fail => f.write_str("FAIL"),
        }
    }
}

/// Status plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: SuccessType,
    pub message: String,
}

/// Result of a validation step; the error side is the rejecting outcome.
pub type Checked<T> = Result<T, Outcome>;

impl Outcome {
    pub fn new(status: SuccessType, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(SuccessType::Pass, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(SuccessType::Warning, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(SuccessType::Fail, message)
    }

    /// `WARNING` for a check-only run, `FAIL` otherwise.
    ///
    /// Used for conditions another transaction in the same block could fix.
    pub fn fail_or_warn(check_only: bool, message: impl Into<String>) -> Self {
        if check_only {
            Self::warning(message)
        } else {
            Self::fail(message)
        }
    }

    /// `FAIL` for a check-only run, `PASS` otherwise.
    ///
    /// Used by settlement events that defer themselves: the event is
    /// accepted and retried later, while a check-only run reports it as not settleable.
    pub fn deferred(check_only: bool, message: impl Into<String>) -> Self {
        if check_only {
            Self::fail(message)
        } else {
            Self::pass(message)
        }
    }

    /// Successful check-only run.
    pub fn check_only() -> Self {
        Self::pass(CHECK_ONLY_MESSAGE)
    }

    pub fn is_pass(&self) -> bool {
        self.status == SuccessType::Pass
    }

    pub fn is_warning(&self) -> bool {
        self.status == SuccessType::Warning
    }

    pub fn is_fail(&self) -> bool {
        self.status == SuccessType::Fail
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{}: {}", self.status, self.message)
        }
    }
}
