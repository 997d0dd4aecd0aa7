//! Append-only record chain
//!
//! Records live in an arena and refer to their successor by [`RecordId`].
//! The chain tracks its head and tail so appends are O(1) and dropping the
//! chain never recurses through the links.

use crate::types::{RecordId, TransactionRecord};
use crate::{Error, Result};

/// Forward-linked sequence of transaction records
#[derive(Debug, Clone, Default)]
pub struct Chain {
    /// Record arena, in append order
    records: Vec<TransactionRecord>,
    /// Head of the chain
    first: Option<RecordId>,
    /// Tail of the chain
    last: Option<RecordId>,
}

impl Chain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Head handle
    pub fn first(&self) -> Option<RecordId> {
        self.first
    }

    /// Tail handle
    pub fn last(&self) -> Option<RecordId> {
        self.last
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the chain has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record
    pub fn get(&self, id: RecordId) -> Option<&TransactionRecord> {
        self.records.get(id.index())
    }

    /// Tail record
    pub fn tail(&self) -> Option<&TransactionRecord> {
        self.last.and_then(|id| self.get(id))
    }

    /// Append a record, linking the previous tail to it
    ///
    /// Fails only if head/tail bookkeeping is already inconsistent; nothing is
    /// written in that case.
    pub fn append(&mut self, record: TransactionRecord) -> Result<RecordId> {
        if record.next().is_some() {
            return Err(Error::InvariantViolation(
                "Appended record already has a successor".to_string(),
            ));
        }
        if self.first.is_some() != self.last.is_some() {
            return Err(Error::InvariantViolation(
                "Chain head and tail disagree on emptiness".to_string(),
            ));
        }
        if let Some(tail) = self.last {
            if tail.index() >= self.records.len() {
                return Err(Error::InvariantViolation(format!(
                    "Chain tail {} is out of range",
                    tail
                )));
            }
        }

        let id = RecordId::new(self.records.len());
        self.records.push(record);

        match self.last {
            Some(tail) => self.records[tail.index()].link_next(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);

        Ok(id)
    }

    /// Walk the chain from head to tail by following `next` links
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: self.first,
            remaining: self.records.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, id: RecordId) -> Option<&mut TransactionRecord> {
        self.records.get_mut(id.index())
    }
}

/// Iterator over `(RecordId, &TransactionRecord)` in chain order
#[derive(Debug)]
pub struct ChainIter<'a> {
    chain: &'a Chain,
    cursor: Option<RecordId>,
    /// Bounds the walk so a cyclic link cannot loop forever
    remaining: usize,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = (RecordId, &'a TransactionRecord);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.cursor?;
        let record = self.chain.get(id)?;
        self.remaining -= 1;
        self.cursor = record.next();
        Some((id, record))
    }
}
