//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode) of the digest input
//! - Validation at construction (no empty names, no zero amounts)
//! - Arena handles instead of owning pointers between records

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Party name (miner, sender or recipient)
///
/// Never empty. Deserialization goes through the same check as [`PartyName::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyName(String);

impl PartyName {
    /// Create a party name, rejecting the empty string
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "Party name must not be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartyName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PartyName> for String {
    fn from(name: PartyName) -> Self {
        name.0
    }
}

impl Borrow<str> for PartyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-width digest linking a record to its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(u64);

impl Digest {
    /// Sentinel stored by the first record of a chain
    pub const ZERO: Digest = Digest(0);

    /// Wrap a raw digest value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Build from the leading 8 bytes of a wider hash output (big-endian)
    pub fn from_prefix(bytes: &[u8; 32]) -> Self {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&bytes[..8]);
        Self(u64::from_be_bytes(prefix))
    }

    /// Raw value
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the zero sentinel
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Opaque handle of a record inside the ledger's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(usize);

impl RecordId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of ledger event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Value created for a miner, no sender
    Mining = 1,
    /// Value moved from sender to recipient
    Transfer = 2,
}

/// Balance a transfer's sender is checked against while replaying the chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderCheck {
    /// Balance accumulated so far during the replay
    #[default]
    RunningBalance,
    /// Current cached balance in the index
    ///
    /// Rejects any chain in which a sender later spent down to less than an
    /// earlier transfer amount, including ledgers built only through the API.
    CachedBalance,
}

/// One immutable event in the chain
///
/// Deserialization applies the same checks as the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct TransactionRecord {
    /// Sender (absent for mining)
    sender: Option<PartyName>,

    /// Recipient, or the miner for a mining record
    recipient: PartyName,

    /// Amount moved or created (always > 0)
    amount: u64,

    /// Chronologically following record, absent for the tail
    next: Option<RecordId>,

    /// Digest of the preceding record, `Digest::ZERO` for the first one
    prev_digest: Digest,

    /// Auxiliary input to the digest function
    nonce: u64,
}

/// Unvalidated wire form of a record
#[derive(Deserialize)]
struct RawRecord {
    sender: Option<PartyName>,
    recipient: PartyName,
    amount: u64,
    next: Option<RecordId>,
    prev_digest: Digest,
    nonce: u64,
}

impl TryFrom<RawRecord> for TransactionRecord {
    type Error = Error;

    fn try_from(raw: RawRecord) -> Result<Self> {
        let mut record = Self::build(raw.sender, raw.recipient, raw.amount, raw.prev_digest)?;
        record.next = raw.next;
        record.nonce = raw.nonce;
        Ok(record)
    }
}

/// Field set fed to the digest function, in canonical order
#[derive(Serialize)]
struct DigestInput<'a> {
    sender: Option<&'a str>,
    recipient: &'a str,
    amount: u64,
    prev_digest: u64,
    nonce: u64,
}

impl TransactionRecord {
    /// Create a mining record
    pub fn mining(miner: PartyName, amount: u64, prev_digest: Digest) -> Result<Self> {
        Self::build(None, miner, amount, prev_digest)
    }

    /// Create a transfer record
    pub fn transfer(
        sender: PartyName,
        recipient: PartyName,
        amount: u64,
        prev_digest: Digest,
    ) -> Result<Self> {
        Self::build(Some(sender), recipient, amount, prev_digest)
    }

    fn build(
        sender: Option<PartyName>,
        recipient: PartyName,
        amount: u64,
        prev_digest: Digest,
    ) -> Result<Self> {
        if amount == 0 {
            return Err(Error::InvalidArgument(
                "Amount must be positive".to_string(),
            ));
        }

        Ok(Self {
            sender,
            recipient,
            amount,
            next: None,
            prev_digest,
            nonce: 0,
        })
    }

    /// Sender, `None` for mining
    pub fn sender(&self) -> Option<&PartyName> {
        self.sender.as_ref()
    }

    /// Recipient (or miner)
    pub fn recipient(&self) -> &PartyName {
        &self.recipient
    }

    /// Amount
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Forward link
    pub fn next(&self) -> Option<RecordId> {
        self.next
    }

    /// Digest of the predecessor at creation time
    pub fn prev_digest(&self) -> Digest {
        self.prev_digest
    }

    /// Nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Mining or transfer
    pub fn kind(&self) -> TransactionKind {
        match self.sender {
            Some(_) => TransactionKind::Transfer,
            None => TransactionKind::Mining,
        }
    }

    /// Canonical bytes for digesting
    ///
    /// The forward link is excluded: it is set after the record is digested by its successor.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let input = DigestInput {
            sender: self.sender.as_ref().map(PartyName::as_str),
            recipient: self.recipient.as_str(),
            amount: self.amount,
            prev_digest: self.prev_digest.value(),
            nonce: self.nonce,
        };
        Ok(bincode::serialize(&input)?)
    }

    pub(crate) fn link_next(&mut self, next: RecordId) {
        self.next = Some(next);
    }

    #[cfg(test)]
    pub(crate) fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    #[cfg(test)]
    pub(crate) fn set_amount(&mut self, amount: u64) {
        self.amount = amount;
    }
}
