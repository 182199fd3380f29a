//! Deduplication and the accumulation buffer
//!
//! The [`Deduplicator`] owns both the seen-key set and the ordered buffer of
//! admitted records. The two are only ever changed together, so every
//! buffered record has its key in the set and the set holds nothing else.

use crate::record::{normalize_title, Field, Record};
use std::collections::HashSet;

/// How a source identifies a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKey {
    /// A stable source-provided identifier in the `id` column
    Identifier,
    /// The title with whitespace normalized, for sources without identifiers
    NormalizedTitle,
}

impl DedupKey {
    /// Column that must exist in a checkpoint for it to be reusable
    pub fn column(&self) -> Field {
        match self {
            Self::Identifier => Field::Id,
            Self::NormalizedTitle => Field::Title,
        }
    }

    /// Extracts the key of a record, `None` when it has no usable key
    pub fn extract(&self, record: &Record) -> Option<String> {
        let raw = record.field(self.column())?.to_string();
        let key = match self {
            Self::Identifier => raw.trim().to_string(),
            Self::NormalizedTitle => normalize_title(&raw),
        };
        (!key.is_empty()).then_some(key)
    }
}

/// Outcome of reconciling previously persisted records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Records kept in the buffer
    pub kept: usize,
    /// Records dropped because they had no key
    pub missing_key: usize,
    /// Records dropped because an earlier record had the same key
    pub duplicates: usize,
}

/// Seen-key set plus the ordered buffer of admitted records
#[derive(Debug, Clone)]
pub struct Deduplicator {
    key: DedupKey,
    seen: HashSet<String>,
    buffer: Vec<Record>,
}

impl Deduplicator {
    pub fn new(key: DedupKey) -> Self {
        Self {
            key,
            seen: HashSet::new(),
            buffer: Vec::new(),
        }
    }

    /// Reconciles previously persisted records into the seen-set and buffer
    ///
    /// Must run before any new record is admitted so that prior data keeps
    /// its place at the front of the buffer.
    pub fn seed(&mut self, prior: Vec<Record>) -> SeedSummary {
        let mut summary = SeedSummary::default();

        for record in prior {
            if self.key.extract(&record).is_none() {
                summary.missing_key += 1;
            } else if self.admit(record) {
                summary.kept += 1;
            } else {
                summary.duplicates += 1;
            }
        }

        summary
    }

    /// True if the record has a key that has not been seen yet
    pub fn is_new(&self, record: &Record) -> bool {
        self.key
            .extract(record)
            .is_some_and(|key| !self.seen.contains(&key))
    }

    /// Admits a record if its key is new
    ///
    /// Returns true when the record was appended to the buffer. Records
    /// without a key and later duplicates are dropped.
    pub fn admit(&mut self, record: Record) -> bool {
        let Some(key) = self.key.extract(&record) else {
            return false;
        };

        if !self.seen.insert(key) {
            return false;
        }

        self.buffer.push(record);
        true
    }

    /// Admitted records in first-seen order
    pub fn records(&self) -> &[Record] {
        &self.buffer
    }

    pub fn into_records(self) -> Vec<Record> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
