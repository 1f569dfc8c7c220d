//! Tracing subscriber setup.
//!
//! Logs always go to stderr: stdout carries the editor protocol.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::{self, SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::config::{BridgeConfig, LogFormat};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },
    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Install the stderr subscriber described by `config`. Returns `false` when
/// an earlier call already installed one; the first configuration wins.
pub fn initialise(config: &BridgeConfig) -> Result<bool, TelemetryError> {
    let mut installed_now = false;
    INSTALLED.get_or_try_init(|| {
        install(config)?;
        installed_now = true;
        Ok::<_, TelemetryError>(config.log_format())
    })?;
    Ok(installed_now)
}

fn filter(config: &BridgeConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_string(),
        reason: error.to_string(),
    })
}

fn install(config: &BridgeConfig) -> Result<(), TelemetryError> {
    let base = fmt()
        .with_env_filter(filter(config)?)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    match config.log_format() {
        LogFormat::Json => subscriber::set_global_default(base.json().flatten_event(true).finish())?,
        LogFormat::Compact => subscriber::set_global_default(base.compact().finish())?,
    }
    Ok(())
}
