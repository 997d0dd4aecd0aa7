//! Configuration for the ledger

use crate::crypto::DigestAlgorithm;
use crate::types::SenderCheck;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Digest used to chain records
    pub digest_algorithm: DigestAlgorithm,

    /// Sender check used by balance verification
    pub sender_check: SenderCheck,

    /// Attach Prometheus metrics to the ledger
    pub metrics_enabled: bool,

    /// Tracing filter directive (e.g. `info`, `coin_ledger=debug`)
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "coin-ledger".to_string(),
            digest_algorithm: DigestAlgorithm::Sha256,
            sender_check: SenderCheck::RunningBalance,
            metrics_enabled: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document; missing keys take their defaults
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(algorithm) = std::env::var("LEDGER_DIGEST_ALGORITHM") {
            config.digest_algorithm = DigestAlgorithm::from_name(&algorithm).ok_or_else(|| {
                crate::Error::Config(format!("Unknown digest algorithm: {}", algorithm))
            })?;
        }

        if let Ok(check) = std::env::var("LEDGER_SENDER_CHECK") {
            config.sender_check = match check.as_str() {
                "running_balance" => SenderCheck::RunningBalance,
                "cached_balance" => SenderCheck::CachedBalance,
                other => {
                    return Err(crate::Error::Config(format!("Unknown sender check: {}", other)))
                }
            };
        }

        if let Ok(enabled) = std::env::var("LEDGER_METRICS_ENABLED") {
            config.metrics_enabled = enabled.parse().map_err(|_| {
                crate::Error::Config(format!("LEDGER_METRICS_ENABLED is not a bool: {}", enabled))
            })?;
        }

        if let Ok(filter) = std::env::var("LEDGER_LOG_FILTER") {
            config.log_filter = filter;
        }

        Ok(config)
    }
}
