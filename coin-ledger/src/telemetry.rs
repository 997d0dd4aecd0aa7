//! Tracing subscriber setup driven by [`Config::log_filter`]

use crate::{Config, Error, Result};
use tracing_subscriber::EnvFilter;

/// Build the event filter from the configured directive
pub fn env_filter(config: &Config) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.log_filter).map_err(|e| {
        Error::Config(format!("Invalid log filter {:?}: {}", config.log_filter, e))
    })
}

/// Install a global fmt subscriber filtered by `config.log_filter`
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = env_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(service = %config.service_name, filter = %config.log_filter, "Tracing initialized");
    Ok(())
}
