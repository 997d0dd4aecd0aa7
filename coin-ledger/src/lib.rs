//! Coin Ledger
//!
//! Append-only, hash-chained ledger of mining and transfer events with a
//! derived balance index.
//!
//! # Architecture
//!
//! - **Chain**: Arena of immutable records linked forward, head and tail tracked for O(1) append
//! - **Digest Linking**: Each record stores the digest of its predecessor
//! - **Balance Index**: Party → balance cache, updated together with every append
//! - **Verification**: Balances re-derived from the chain and cross-checked against the index
//!
//! # Invariants
//!
//! - Conservation: Σ(balances) == Σ(mined amounts)
//! - Non-negative balances, non-empty party names, positive amounts
//! - Append-only: Records never modified or removed
//! - Validate-then-commit: A rejected mutation leaves chain and index untouched

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod shared;
pub mod telemetry;
pub mod types;

// Re-exports
pub use config::Config;
pub use crypto::{Blake3Digest, DigestAlgorithm, FnDigest, Sha256Digest, TransactionDigest};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use shared::SharedLedger;
pub use telemetry::init_tracing;
pub use types::{Digest, PartyName, RecordId, SenderCheck, TransactionKind, TransactionRecord};
