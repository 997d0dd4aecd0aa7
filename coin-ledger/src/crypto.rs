//! Digest functions for chaining records
//!
//! This module provides:
//! - The [`TransactionDigest`] capability injected into the ledger
//! - SHA-256 and BLAKE3 implementations truncated to a fixed-width integer
//! - A runtime-selectable [`DigestAlgorithm`] for configuration-driven ledgers

use crate::types::{Digest, TransactionRecord};
use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Deterministic function from a record's canonical field set to a [`Digest`]
pub trait TransactionDigest: Send + Sync {
    /// Hash canonical bytes
    fn digest(&self, input: &[u8]) -> Digest;

    /// Digest a full record (sender, recipient, amount, prev digest, nonce)
    fn digest_record(&self, record: &TransactionRecord) -> Result<Digest> {
        let canonical_bytes = record.canonical_bytes()?;
        Ok(self.digest(&canonical_bytes))
    }
}

/// SHA-256, leading 8 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha256Digest;

impl TransactionDigest for Sha256Digest {
    fn digest(&self, input: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(input);
        let hash: [u8; 32] = hasher.finalize().into();
        Digest::from_prefix(&hash)
    }
}

/// BLAKE3, leading 8 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blake3Digest;

impl TransactionDigest for Blake3Digest {
    fn digest(&self, input: &[u8]) -> Digest {
        Digest::from_prefix(blake3::hash(input).as_bytes())
    }
}

/// Adapter turning any closure into a digest capability
pub struct FnDigest<F>(pub F);

impl<F> TransactionDigest for FnDigest<F>
where
    F: Fn(&[u8]) -> Digest + Send + Sync,
{
    fn digest(&self, input: &[u8]) -> Digest {
        (self.0)(input)
    }
}

impl<F> fmt::Debug for FnDigest<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnDigest")
    }
}

/// Digest algorithm chosen at runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl DigestAlgorithm {
    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }

    /// Parse from configuration name (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Some(DigestAlgorithm::Sha256),
            "blake3" => Some(DigestAlgorithm::Blake3),
            _ => None,
        }
    }
}

impl TransactionDigest for DigestAlgorithm {
    fn digest(&self, input: &[u8]) -> Digest {
        match self {
            DigestAlgorithm::Sha256 => Sha256Digest.digest(input),
            DigestAlgorithm::Blake3 => Blake3Digest.digest(input),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
