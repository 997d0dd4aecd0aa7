//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_mining_total` - Mining records appended
//! - `ledger_transfers_total` - Transfer records appended
//! - `ledger_transfers_rejected_total` - Transfers refused before any write
//! - `ledger_verifications_failed_total` - Balance or digest checks that returned false
//! - `ledger_chain_length` - Records in the chain

use prometheus::{IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Each collector owns its registry, so several ledgers can coexist in one process.
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Mining records appended
    pub mining_total: IntCounter,

    /// Transfer records appended
    pub transfers_total: IntCounter,

    /// Rejected transfers
    pub transfers_rejected: IntCounter,

    /// Failed verifications
    pub verifications_failed: IntCounter,

    /// Chain length
    pub chain_length: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let mining_total =
            IntCounter::new("ledger_mining_total", "Total number of mining records appended")?;
        registry.register(Box::new(mining_total.clone()))?;

        let transfers_total = IntCounter::new(
            "ledger_transfers_total",
            "Total number of transfer records appended",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let transfers_rejected = IntCounter::new(
            "ledger_transfers_rejected_total",
            "Total number of transfers rejected before any write",
        )?;
        registry.register(Box::new(transfers_rejected.clone()))?;

        let verifications_failed = IntCounter::new(
            "ledger_verifications_failed_total",
            "Total number of failed balance or digest verifications",
        )?;
        registry.register(Box::new(verifications_failed.clone()))?;

        let chain_length = IntGauge::new("ledger_chain_length", "Records in the chain")?;
        registry.register(Box::new(chain_length.clone()))?;

        Ok(Self {
            mining_total,
            transfers_total,
            transfers_rejected,
            verifications_failed,
            chain_length,
            registry,
        })
    }

    /// Record a mining append
    pub fn record_mining(&self, chain_length: usize) {
        self.mining_total.inc();
        self.chain_length.set(chain_length as i64);
    }

    /// Record a transfer append
    pub fn record_transfer(&self, chain_length: usize) {
        self.transfers_total.inc();
        self.chain_length.set(chain_length as i64);
    }

    /// Record a rejected transfer
    pub fn record_rejection(&self) {
        self.transfers_rejected.inc();
    }

    /// Record a failed verification
    pub fn record_verification_failure(&self) {
        self.verifications_failed.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
