//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the root span
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error or a full directive)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Include the module target in each record
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "settlement-ledger".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SL_SERVICE_NAME`: Service name (default: settlement-ledger)
    /// - `SL_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SL_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `SL_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("SL_SERVICE_NAME")
                .unwrap_or_else(|_| "settlement-ledger".to_string()),

            log_level: env::var("SL_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("SL_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("SL_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            with_target: true,
        }
    }

    /// Configuration for tests: debug level, no console noise.
    pub fn for_tests() -> Self {
        Self {
            log_level: "debug".to_string(),
            console_output: false,
            ..Self::default()
        }
    }
}
