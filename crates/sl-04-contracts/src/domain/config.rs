//! Ledger-wide settings read by every contract operation.

use shared_types::Timestamp;
use std::env;
use std::str::FromStr;

/// Smallest accepted transaction age window, in seconds.
pub const MIN_TX_AGE: i64 = 5;

/// Settings of the ledger the snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateConfig {
    /// Transactions for other chains are ignored.
    pub chain_id: u32,

    /// Enforce address permission bits and tx authorisations.
    pub authorise_by_address: bool,

    /// Destination addresses must already exist in state.
    pub must_register: bool,

    /// Maximum distance between a transaction timestamp and block time.
    pub max_tx_age: i64,

    /// How far in the future a DvP may start.
    pub max_dvp_start_delay: i64,

    /// Longest allowed DvP lifetime.
    pub max_dvp_duration: i64,

    pub max_encumbrance_name_length: usize,

    pub max_payment_metadata_length: usize,

    /// Delay before a DvP short of funds is retried.
    pub dvp_retry_delay: Timestamp,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            authorise_by_address: false,
            must_register: false,
            max_tx_age: 86_400,
            max_dvp_start_delay: 2_678_400,
            max_dvp_duration: 15_552_000,
            max_encumbrance_name_length: 1_024,
            max_payment_metadata_length: 10_240,
            dvp_retry_delay: 15,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}

impl StateConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SL_CHAIN_ID` (default: 1)
    /// - `SL_AUTHORISE_BY_ADDRESS`, `SL_MUST_REGISTER` (default: false)
    /// - `SL_MAX_TX_AGE` (default: 86400, never below 5)
    /// - `SL_MAX_DVP_START_DELAY`, `SL_MAX_DVP_DURATION`
    /// - `SL_MAX_ENCUMBRANCE_NAME_LENGTH`, `SL_MAX_PAYMENT_METADATA_LENGTH`
    /// - `SL_DVP_RETRY_DELAY` (default: 15)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chain_id: env_or("SL_CHAIN_ID", defaults.chain_id),
            authorise_by_address: env_flag("SL_AUTHORISE_BY_ADDRESS", defaults.authorise_by_address),
            must_register: env_flag("SL_MUST_REGISTER", defaults.must_register),
            max_tx_age: env_or("SL_MAX_TX_AGE", defaults.max_tx_age).max(MIN_TX_AGE),
            max_dvp_start_delay: env_or("SL_MAX_DVP_START_DELAY", defaults.max_dvp_start_delay),
            max_dvp_duration: env_or("SL_MAX_DVP_DURATION", defaults.max_dvp_duration),
            max_encumbrance_name_length: env_or(
                "SL_MAX_ENCUMBRANCE_NAME_LENGTH",
                defaults.max_encumbrance_name_length,
            ),
            max_payment_metadata_length: env_or(
                "SL_MAX_PAYMENT_METADATA_LENGTH",
                defaults.max_payment_metadata_length,
            ),
            dvp_retry_delay: env_or("SL_DVP_RETRY_DELAY", defaults.dvp_retry_delay),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u32) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_authorise_by_address(mut self, enabled: bool) -> Self {
        self.authorise_by_address = enabled;
        self
    }

    pub fn with_must_register(mut self, enabled: bool) -> Self {
        self.must_register = enabled;
        self
    }

    pub fn with_max_tx_age(mut self, seconds: i64) -> Self {
        self.max_tx_age = seconds.max(MIN_TX_AGE);
        self
    }

    pub fn with_dvp_retry_delay(mut self, seconds: Timestamp) -> Self {
        self.dvp_retry_delay = seconds;
        self
    }

    /// Is a transaction stamped `timestamp` acceptable at block time `now`?
    /// A zero timestamp is never checked.
    pub fn tx_age_ok(&self, timestamp: Timestamp, now: Timestamp) -> bool {
        timestamp <= 0 || (timestamp - now).abs() <= self.max_tx_age
    }
}
