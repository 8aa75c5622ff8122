//! Subscriber installation.
//!
//! Records carry consistent fields so log shippers can parse them:
//! - `level`, `target`, `message`
//! - `subsystem`: settlement subsystem (state-store, poa, contracts, ...)
//! - `tx_hash` / `contract` where relevant

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Guard returned by [`init_logging`]. Holding it keeps the service span
/// entered for the lifetime of the application.
pub struct LoggingGuard {
    _span: tracing::span::EnteredSpan,
}

/// Install the global `tracing` subscriber.
///
/// Fails with [`TelemetryError::AlreadyInitialized`] if another subscriber is
/// already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::InvalidFilter {
            filter: config.log_level.clone(),
            reason: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match (config.console_output, config.json_logs) {
        (true, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        (true, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(config.with_target)
                    .with_ansi(true),
            )
            .try_init(),
        (false, _) => registry.try_init(),
    };
    installed.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    let span = tracing::info_span!("service", name = %config.service_name).entered();
    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(LoggingGuard { _span: span })
}
