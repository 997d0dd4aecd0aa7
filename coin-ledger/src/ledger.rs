//! Main ledger: record chain plus balance index
//!
//! The chain is the source of truth. The balance index is a cache over it
//! that every mutation updates together with the append, after all checks
//! have passed.
//!
//! # Example
//!
//! ```
//! use coin_ledger::Ledger;
//!
//! # fn main() -> coin_ledger::Result<()> {
//! let mut ledger = Ledger::new();
//! ledger.record_mining("David", 50)?;
//! ledger.record_mining("Mario", 20)?;
//! ledger.record_transfer("David", "Mario", 10)?;
//!
//! assert_eq!(ledger.get_balance("David")?, 40);
//! assert_eq!(ledger.get_balance("Mario")?, 30);
//! assert!(ledger.verify_balance());
//! # Ok(())
//! # }
//! ```

use crate::{
    chain::{Chain, ChainIter},
    crypto::{DigestAlgorithm, Sha256Digest, TransactionDigest},
    metrics::Metrics,
    types::{Digest, PartyName, RecordId, SenderCheck, TransactionKind, TransactionRecord},
    Config, Error, Result,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Append-only ledger of mining and transfer records
#[derive(Debug)]
pub struct Ledger<D = Sha256Digest> {
    /// Record chain (source of truth)
    chain: Chain,

    /// Balance per party, derived from the chain
    balances: HashMap<PartyName, u64>,

    /// Digest used to link each record to its predecessor
    digest: D,

    /// Sender check applied by `verify_balance`
    sender_check: SenderCheck,

    /// Optional metrics sink
    metrics: Option<Metrics>,
}

impl Ledger<Sha256Digest> {
    /// Create an empty ledger chained with SHA-256
    pub fn new() -> Self {
        Self::with_digest(Sha256Digest)
    }
}

impl Default for Ledger<Sha256Digest> {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger<DigestAlgorithm> {
    /// Create an empty ledger from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut ledger =
            Self::with_digest(config.digest_algorithm).with_sender_check(config.sender_check);

        if config.metrics_enabled {
            ledger = ledger.with_metrics(Metrics::new()?);
        }

        info!(
            service = %config.service_name,
            digest = %config.digest_algorithm,
            sender_check = ?config.sender_check,
            metrics = config.metrics_enabled,
            "Ledger created"
        );

        Ok(ledger)
    }
}

impl<D: TransactionDigest> Ledger<D> {
    /// Create an empty ledger with the given digest function
    pub fn with_digest(digest: D) -> Self {
        Self {
            chain: Chain::new(),
            balances: HashMap::new(),
            digest,
            sender_check: SenderCheck::default(),
            metrics: None,
        }
    }

    /// Choose the sender check used by `verify_balance`
    pub fn with_sender_check(mut self, sender_check: SenderCheck) -> Self {
        self.sender_check = sender_check;
        self
    }

    /// Attach metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.chain_length.set(self.chain.len() as i64);
        self.metrics = Some(metrics);
        self
    }

    /// Record a mining event crediting `miner` with `amount`
    pub fn record_mining(&mut self, miner: &str, amount: u64) -> Result<RecordId> {
        let miner = PartyName::new(miner)?;
        let credited = self.balance_or_zero(&miner).checked_add(amount).ok_or_else(|| {
            Error::InvalidArgument(format!("Mining {} would overflow {}'s balance", amount, miner))
        })?;

        let record = TransactionRecord::mining(miner.clone(), amount, self.tail_digest()?)?;
        let id = self.chain.append(record)?;
        self.balances.insert(miner.clone(), credited);

        if let Some(ref metrics) = self.metrics {
            metrics.record_mining(self.chain.len());
        }
        debug!(record = %id, miner = %miner, amount, "Mining recorded");

        Ok(id)
    }

    /// Record a transfer of `amount` from `sender` to `recipient`
    ///
    /// Every check runs before the chain or the index is touched, so a rejected
    /// transfer leaves the ledger unchanged.
    pub fn record_transfer(&mut self, sender: &str, recipient: &str, amount: u64) -> Result<RecordId> {
        match self.apply_transfer(sender, recipient, amount) {
            Ok(id) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_transfer(self.chain.len());
                }
                debug!(record = %id, sender, recipient, amount, "Transfer recorded");
                Ok(id)
            }
            Err(err) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_rejection();
                }
                warn!(sender, recipient, amount, error = %err, "Transfer rejected");
                Err(err)
            }
        }
    }

    fn apply_transfer(&mut self, sender: &str, recipient: &str, amount: u64) -> Result<RecordId> {
        let sender = PartyName::new(sender)?;
        let recipient = PartyName::new(recipient)?;
        if amount == 0 {
            return Err(Error::InvalidArgument(
                "Amount must be positive".to_string(),
            ));
        }

        let sender_balance = *self
            .balances
            .get(&sender)
            .ok_or_else(|| Error::UnknownParty(sender.to_string()))?;
        if sender_balance < amount {
            return Err(Error::InsufficientBalance {
                party: sender.to_string(),
                balance: sender_balance,
                requested: amount,
            });
        }

        let debited = sender_balance - amount;
        let credited = if recipient == sender {
            sender_balance
        } else {
            self.balance_or_zero(&recipient).checked_add(amount).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Transfer of {} would overflow {}'s balance",
                    amount, recipient
                ))
            })?
        };

        let record = TransactionRecord::transfer(
            sender.clone(),
            recipient.clone(),
            amount,
            self.tail_digest()?,
        )?;
        let id = self.chain.append(record)?;
        self.balances.insert(sender, debited);
        self.balances.insert(recipient, credited);

        Ok(id)
    }

    /// Current balance of `person`
    pub fn get_balance(&self, person: &str) -> Result<u64> {
        if person.is_empty() {
            return Err(Error::InvalidArgument(
                "Party name must not be empty".to_string(),
            ));
        }
        self.balances
            .get(person)
            .copied()
            .ok_or_else(|| Error::UnknownParty(person.to_string()))
    }

    /// Re-derive every balance from the chain and compare with the index
    ///
    /// Returns false when a transfer in the chain fails the sender check, when
    /// the chain names a party the index does not know, or when the replayed
    /// balances differ from the index.
    pub fn verify_balance(&self) -> bool {
        let mut balance_so_far: HashMap<&str, i128> = self
            .balances
            .keys()
            .map(|name| (name.as_str(), 0))
            .collect();
        let mut visited = 0usize;

        for (id, record) in self.chain.iter() {
            visited += 1;
            let amount = i128::from(record.amount());

            // Debit first so a self-transfer cannot fund itself.
            if let Some(sender) = record.sender() {
                if !self.debit_sender(&mut balance_so_far, id, sender, amount) {
                    return false;
                }
            }

            match balance_so_far.get_mut(record.recipient().as_str()) {
                Some(entry) => *entry += amount,
                None => {
                    return self.verification_failed(&format!(
                        "record {} credits unknown party {}",
                        id,
                        record.recipient()
                    ))
                }
            }
        }

        if visited != self.chain.len() {
            return self.verification_failed(&format!(
                "walk reached {} of {} records",
                visited,
                self.chain.len()
            ));
        }

        for (name, balance) in &self.balances {
            let derived = balance_so_far.get(name.as_str()).copied().unwrap_or(0);
            if derived != i128::from(*balance) {
                return self.verification_failed(&format!(
                    "{} has {} cached but {} derived",
                    name, balance, derived
                ));
            }
        }

        true
    }

    /// Recompute every link digest and compare with the stored `prev_digest`
    ///
    /// Detects records edited, spliced or reordered after they were chained.
    pub fn verify_digests(&self) -> bool {
        let mut expected = Digest::ZERO;
        let mut visited = 0usize;
        let mut last_seen = None;

        for (id, record) in self.chain.iter() {
            if record.prev_digest() != expected {
                return self.verification_failed(&format!(
                    "record {} links to {} but predecessor digests to {}",
                    id,
                    record.prev_digest(),
                    expected
                ));
            }
            expected = match self.digest.digest_record(record) {
                Ok(digest) => digest,
                Err(err) => {
                    return self.verification_failed(&format!("record {}: {}", id, err))
                }
            };
            visited += 1;
            last_seen = Some(id);
        }

        if visited != self.chain.len() || last_seen != self.chain.last() {
            return self.verification_failed("digest walk did not end at the tail");
        }

        true
    }

    /// Whether the sum of balances equals the total amount ever mined
    pub fn check_conservation(&self) -> bool {
        let mined: u128 = self
            .chain
            .iter()
            .filter(|(_, record)| record.kind() == TransactionKind::Mining)
            .map(|(_, record)| u128::from(record.amount()))
            .sum();

        mined == self.total_supply()
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| u128::from(*b)).sum()
    }

    /// Head of the chain
    pub fn first(&self) -> Option<RecordId> {
        self.chain.first()
    }

    /// Tail of the chain
    pub fn last(&self) -> Option<RecordId> {
        self.chain.last()
    }

    /// Look up a record
    pub fn record(&self, id: RecordId) -> Option<&TransactionRecord> {
        self.chain.get(id)
    }

    /// Records from first to last
    pub fn iter(&self) -> ChainIter<'_> {
        self.chain.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether no record has been appended
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Balance index (read-only)
    pub fn balances(&self) -> &HashMap<PartyName, u64> {
        &self.balances
    }

    /// Digest function in use
    pub fn digest_function(&self) -> &D {
        &self.digest
    }

    /// Sender check in use
    pub fn sender_check(&self) -> SenderCheck {
        self.sender_check
    }

    /// Attached metrics
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    fn balance_or_zero(&self, party: &PartyName) -> u64 {
        self.balances.get(party).copied().unwrap_or(0)
    }

    /// Digest of the current tail, or the zero sentinel for an empty chain
    fn tail_digest(&self) -> Result<Digest> {
        match self.chain.last() {
            None => Ok(Digest::ZERO),
            Some(id) => {
                let tail = self.chain.tail().ok_or_else(|| {
                    Error::InvariantViolation(format!("Chain tail {} has no record", id))
                })?;
                self.digest.digest_record(tail)
            }
        }
    }

    /// Apply the configured sender check, then debit the replay accumulator
    fn debit_sender(
        &self,
        balance_so_far: &mut HashMap<&str, i128>,
        id: RecordId,
        sender: &PartyName,
        amount: i128,
    ) -> bool {
        let available = match self.sender_check {
            SenderCheck::RunningBalance => balance_so_far.get(sender.as_str()).copied(),
            SenderCheck::CachedBalance => {
                self.balances.get(sender).map(|balance| i128::from(*balance))
            }
        };
        match available {
            Some(balance) if balance != 0 && balance >= amount => {}
            Some(balance) => {
                return self.verification_failed(&format!(
                    "record {} spends {} from {} holding {}",
                    id, amount, sender, balance
                ))
            }
            None => {
                return self.verification_failed(&format!(
                    "record {} debits unknown party {}",
                    id, sender
                ))
            }
        }

        match balance_so_far.get_mut(sender.as_str()) {
            Some(entry) => {
                *entry -= amount;
                true
            }
            None => self.verification_failed(&format!(
                "record {} debits unknown party {}",
                id, sender
            )),
        }
    }

    fn verification_failed(&self, reason: &str) -> bool {
        if let Some(ref metrics) = self.metrics {
            metrics.record_verification_failure();
        }
        warn!(reason, "Ledger verification failed");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Blake3Digest, FnDigest};

    fn scenario_two() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 50).unwrap();
        ledger.record_mining("Mario", 20).unwrap();
        ledger.record_transfer("David", "Mario", 10).unwrap();
        ledger
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.first(), None);
        assert_eq!(ledger.last(), None);
        assert!(ledger.balances().is_empty());
        assert!(ledger.verify_balance());
        assert!(ledger.verify_digests());
    }

    #[test]
    fn test_record_mining_accumulates() {
        let mut ledger = Ledger::new();
        let first = ledger.record_mining("David", 5).unwrap();
        let second = ledger.record_mining("David", 8).unwrap();

        assert_eq!(ledger.get_balance("David").unwrap(), 13);
        assert_eq!(ledger.first(), Some(first));
        assert_eq!(ledger.last(), Some(second));
        assert_eq!(ledger.record(first).unwrap().next(), Some(second));
    }

    #[test]
    fn test_record_mining_invalid_arguments() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.record_mining("", 5),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.record_mining("David", 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ledger.is_empty());
        assert!(ledger.balances().is_empty());
    }

    #[test]
    fn test_first_record_has_zero_digest() {
        let mut ledger = Ledger::new();
        let id = ledger.record_mining("David", 50).unwrap();
        assert_eq!(ledger.record(id).unwrap().prev_digest(), Digest::ZERO);
    }

    #[test]
    fn test_prev_digest_links_to_predecessor() {
        let ledger = scenario_two();
        let records: Vec<_> = ledger.iter().map(|(_, r)| r.clone()).collect();
        assert_eq!(records.len(), 3);

        for pair in records.windows(2) {
            let expected = Sha256Digest.digest_record(&pair[0]).unwrap();
            assert_eq!(pair[1].prev_digest(), expected);
        }
    }

    #[test]
    fn test_transfer_updates_both_parties() {
        let ledger = scenario_two();
        assert_eq!(ledger.get_balance("David").unwrap(), 40);
        assert_eq!(ledger.get_balance("Mario").unwrap(), 30);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.verify_balance());
        assert!(ledger.verify_digests());
    }

    #[test]
    fn test_transfer_to_new_party_creates_entry() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 5).unwrap();
        ledger.record_transfer("David", "Mario", 2).unwrap();

        assert_eq!(ledger.get_balance("David").unwrap(), 3);
        assert_eq!(ledger.get_balance("Mario").unwrap(), 2);
    }

    #[test]
    fn test_transfer_unknown_sender_leaves_ledger_empty() {
        let mut ledger = Ledger::new();
        let err = ledger.record_transfer("David", "Mario", 5).unwrap_err();

        assert!(matches!(err, Error::UnknownParty(ref name) if name == "David"));
        assert_eq!(ledger.first(), None);
        assert_eq!(ledger.last(), None);
        assert!(ledger.balances().is_empty());
    }

    #[test]
    fn test_transfer_insufficient_balance_leaves_ledger_unchanged() {
        let mut ledger = Ledger::new();
        let id = ledger.record_mining("David", 5).unwrap();
        let err = ledger.record_transfer("David", "Mario", 10).unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientBalance { balance: 5, requested: 10, .. }
        ));
        assert_eq!(ledger.first(), Some(id));
        assert_eq!(ledger.last(), Some(id));
        assert_eq!(ledger.record(id).unwrap().next(), None);
        assert_eq!(ledger.balances().len(), 1);
        assert_eq!(ledger.get_balance("David").unwrap(), 5);
        assert!(matches!(
            ledger.get_balance("Mario"),
            Err(Error::UnknownParty(_))
        ));
    }

    #[test]
    fn test_transfer_invalid_arguments() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 5).unwrap();

        for (sender, recipient, amount) in [("", "Mario", 1), ("David", "", 1), ("David", "Mario", 0)] {
            let err = ledger.record_transfer(sender, recipient, amount).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_transfer_entire_balance() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 5).unwrap();
        ledger.record_transfer("David", "Mario", 5).unwrap();

        assert_eq!(ledger.get_balance("David").unwrap(), 0);
        assert!(ledger.verify_balance());
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 5).unwrap();
        ledger.record_transfer("David", "David", 3).unwrap();

        assert_eq!(ledger.get_balance("David").unwrap(), 5);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.verify_balance());
    }

    #[test]
    fn test_overflowing_credit_rejected() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", u64::MAX).unwrap();
        ledger.record_mining("Mario", 1).unwrap();

        assert!(matches!(
            ledger.record_mining("David", 1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.record_transfer("Mario", "David", 1),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get_balance("Mario").unwrap(), 1);
        assert!(ledger.check_conservation());
    }

    #[test]
    fn test_get_balance_errors() {
        let ledger = scenario_two();
        assert!(matches!(ledger.get_balance(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(ledger.get_balance("Luigi"), Err(Error::UnknownParty(_))));
    }

    #[test]
    fn test_verify_detects_tampered_balance() {
        let mut ledger = scenario_two();
        *ledger.balances.get_mut("David").unwrap() += 1000;
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_verify_detects_tampered_balance_after_small_ledger() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 5).unwrap();
        ledger.record_mining("Mario", 8).unwrap();
        ledger.record_transfer("David", "Mario", 2).unwrap();
        assert_eq!(ledger.get_balance("David").unwrap(), 3);
        assert_eq!(ledger.get_balance("Mario").unwrap(), 10);

        *ledger.balances.get_mut("David").unwrap() += 1000;
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_verify_detects_missing_party() {
        let mut ledger = scenario_two();
        ledger.balances.remove("Mario");
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_verify_detects_impossible_replayed_transfer() {
        let mut ledger = scenario_two();
        let transfer = ledger.last().unwrap();
        ledger.chain.get_mut(transfer).unwrap().set_amount(500);
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_verify_detects_inflated_self_transfer() {
        let mut ledger = Ledger::new();
        ledger.record_mining("David", 5).unwrap();
        let transfer = ledger.record_transfer("David", "David", 3).unwrap();
        assert!(ledger.verify_balance());

        // Credit and debit cancel out, so only the sender check can catch this.
        ledger.chain.get_mut(transfer).unwrap().set_amount(500);
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_cached_sender_check_rejects_spent_down_sender() {
        let mut ledger = Ledger::new().with_sender_check(SenderCheck::CachedBalance);
        ledger.record_mining("David", 10).unwrap();
        ledger.record_transfer("David", "Mario", 6).unwrap();
        ledger.record_transfer("David", "Mario", 3).unwrap();

        // David's cached balance (1) is below the first transfer amount (6).
        assert!(!ledger.verify_balance());

        let mut running = Ledger::new();
        running.record_mining("David", 10).unwrap();
        running.record_transfer("David", "Mario", 6).unwrap();
        running.record_transfer("David", "Mario", 3).unwrap();
        assert!(running.verify_balance());
    }

    #[test]
    fn test_cached_sender_check_accepts_scenario() {
        let mut ledger = Ledger::new().with_sender_check(SenderCheck::CachedBalance);
        ledger.record_mining("David", 50).unwrap();
        ledger.record_mining("Mario", 20).unwrap();
        ledger.record_transfer("David", "Mario", 10).unwrap();
        assert!(ledger.verify_balance());

        *ledger.balances.get_mut("David").unwrap() += 1000;
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_verify_digests_detects_edited_record() {
        let mut ledger = scenario_two();
        let first = ledger.first().unwrap();
        ledger.chain.get_mut(first).unwrap().set_amount(51);
        assert!(!ledger.verify_digests());
    }

    #[test]
    fn test_verify_digests_ignores_tail_edit_until_next_append() {
        let mut ledger = scenario_two();
        let tail = ledger.last().unwrap();
        ledger.chain.get_mut(tail).unwrap().set_amount(11);
        assert!(ledger.verify_digests());
        assert!(!ledger.verify_balance());
    }

    #[test]
    fn test_blake3_ledger() {
        let mut ledger = Ledger::with_digest(Blake3Digest);
        ledger.record_mining("David", 50).unwrap();
        let id = ledger.record_mining("Mario", 20).unwrap();

        let first = ledger.record(ledger.first().unwrap()).unwrap();
        assert_eq!(
            ledger.record(id).unwrap().prev_digest(),
            Blake3Digest.digest_record(first).unwrap()
        );
        assert!(ledger.verify_digests());
    }

    #[test]
    fn test_injected_digest_function() {
        let mut ledger = Ledger::with_digest(FnDigest(|input: &[u8]| Digest::new(input.len() as u64)));
        ledger.record_mining("David", 50).unwrap();
        let id = ledger.record_mining("Mario", 20).unwrap();

        assert!(!ledger.record(id).unwrap().prev_digest().is_zero());
        assert!(ledger.verify_digests());
    }

    #[test]
    fn test_from_config_with_metrics() {
        let config = Config {
            digest_algorithm: DigestAlgorithm::Blake3,
            metrics_enabled: true,
            ..Config::default()
        };
        let mut ledger = Ledger::from_config(&config).unwrap();
        ledger.record_mining("David", 5).unwrap();
        ledger.record_transfer("David", "Mario", 2).unwrap();
        let _ = ledger.record_transfer("David", "Mario", 20);
        *ledger.balances.get_mut("David").unwrap() += 1;
        assert!(!ledger.verify_balance());

        let metrics = ledger.metrics().unwrap();
        assert_eq!(metrics.mining_total.get(), 1);
        assert_eq!(metrics.transfers_total.get(), 1);
        assert_eq!(metrics.transfers_rejected.get(), 1);
        assert_eq!(metrics.verifications_failed.get(), 1);
        assert_eq!(metrics.chain_length.get(), 2);
        assert_eq!(*ledger.digest_function(), DigestAlgorithm::Blake3);
    }

    #[test]
    fn test_conservation_and_supply() {
        let ledger = scenario_two();
        assert_eq!(ledger.total_supply(), 70);
        assert!(ledger.check_conservation());
    }
}
