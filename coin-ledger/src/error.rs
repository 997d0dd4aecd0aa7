//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Party has no entry in the balance index
    #[error("Unknown party: {0}")]
    UnknownParty(String),

    /// Transfer amount exceeds the sender's recorded balance
    #[error("Insufficient balance for {party}: has {balance}, requested {requested}")]
    InsufficientBalance {
        /// Sender name
        party: String,
        /// Sender's balance at the time of the request
        balance: u64,
        /// Requested transfer amount
        requested: u64,
    },

    /// Precondition on a name or amount violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Chain and balance index disagree in a way correct use cannot produce
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Serialization error (canonical digest input)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is a business-rule rejection the caller can recover from
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnknownParty(_) | Error::InsufficientBalance { .. } | Error::InvalidArgument(_)
        )
    }
}
