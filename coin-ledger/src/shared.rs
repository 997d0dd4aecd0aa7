//! Shared ledger handle for multi-threaded callers
//!
//! Every mutation runs under one exclusive lock covering the chain append and
//! the balance update, so readers observe either the state before a mutation
//! or the state after it.
//!
//! ```text
//!   SharedLedger (Clone) ──┐
//!   SharedLedger (Clone) ──┼──► Arc<RwLock<Ledger>>
//!   SharedLedger (Clone) ──┘        write: record_mining / record_transfer
//!                                   read:  get_balance / verify_* / len
//! ```

use crate::{
    crypto::{DigestAlgorithm, TransactionDigest},
    ledger::Ledger,
    types::RecordId,
    Config, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, lock-protected ledger handle
#[derive(Debug)]
pub struct SharedLedger<D = DigestAlgorithm> {
    inner: Arc<RwLock<Ledger<D>>>,
}

impl<D> Clone for SharedLedger<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedLedger<DigestAlgorithm> {
    /// Build a shared ledger from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Ledger::from_config(config)?))
    }
}

impl<D: TransactionDigest> SharedLedger<D> {
    /// Wrap an existing ledger
    pub fn new(ledger: Ledger<D>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// See [`Ledger::record_mining`]
    pub fn record_mining(&self, miner: &str, amount: u64) -> Result<RecordId> {
        self.inner.write().record_mining(miner, amount)
    }

    /// See [`Ledger::record_transfer`]
    pub fn record_transfer(&self, sender: &str, recipient: &str, amount: u64) -> Result<RecordId> {
        self.inner.write().record_transfer(sender, recipient, amount)
    }

    /// See [`Ledger::get_balance`]
    pub fn get_balance(&self, person: &str) -> Result<u64> {
        self.inner.read().get_balance(person)
    }

    /// See [`Ledger::verify_balance`]
    pub fn verify_balance(&self) -> bool {
        self.inner.read().verify_balance()
    }

    /// See [`Ledger::verify_digests`]
    pub fn verify_digests(&self) -> bool {
        self.inner.read().verify_digests()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no record has been appended
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Run a closure against a consistent read view of the ledger
    pub fn read<R>(&self, f: impl FnOnce(&Ledger<D>) -> R) -> R {
        let guard = self.inner.read();
        f(&*guard)
    }
}
