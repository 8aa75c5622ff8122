//! # Ledger Telemetry
//!
//! Structured logging for the settlement ledger, built on `tracing` and
//! `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_logging(&config).expect("Failed to init logging");
//!     // Settlement code logs through `tracing` from here on.
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SL_SERVICE_NAME` | `settlement-ledger` | Service name in log records |
//! | `SL_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SL_JSON_LOGS` | `false` | Emit JSON records |
//! | `SL_CONSOLE_OUTPUT` | `true` | Write records to stdout |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Subsystem labels used in structured log records.
pub mod subsystems {
    pub const STATE_STORE: &str = "state-store";
    pub const ENCUMBRANCES: &str = "encumbrances";
    pub const POA: &str = "poa";
    pub const CONTRACTS: &str = "contracts";
    pub const SETTLEMENT: &str = "settlement";
}

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter `{filter}`: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Log a subsystem event with a consistent `subsystem` field.
///
/// ```rust,ignore
/// log_event!(info, subsystems::STATE_STORE, "Layer committed", depth = 2);
/// ```
#[macro_export]
macro_rules! log_event {
    ($level:ident, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $subsystem:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a contract lifecycle event with standard fields.
#[macro_export]
macro_rules! log_contract_event {
    ($level:ident, $msg:expr, $contract:expr, $function:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $crate::subsystems::CONTRACTS,
            contract = %$contract,
            function = %$function,
            $($($field)*,)?
            $msg
        )
    };
}
