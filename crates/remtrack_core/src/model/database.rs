//! In-memory database of rem attempt histories.
//!
//! # Responsibility
//! - Hold the mapping from rem identifier to `RemRecord`.
//! - Implement the per-key overwrite merge used by import.
//!
//! # Invariants
//! - Keys are unique and deterministically ordered (`BTreeMap`), so the
//!   serialized form of equal databases is byte-identical.
//! - `merge_overwrite` replaces colliding records wholesale and never
//!   touches keys absent from the incoming side.

use crate::model::attempt::{accuracy_from_counts, Attempt, RemRecord};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// External rem identifier. Opaque, non-empty after trimming.
pub type RemId = String;

/// Rejection reasons for a rem identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemIdError {
    Empty,
    /// Stored key carries surrounding whitespace.
    Untrimmed(String),
}

impl Display for RemIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "rem id cannot be empty"),
            Self::Untrimmed(value) => {
                write!(f, "rem id `{value}` has leading or trailing whitespace")
            }
        }
    }
}

impl Error for RemIdError {}

/// Trims surrounding whitespace and rejects empty identifiers.
pub fn normalize_rem_id(value: &str) -> Result<RemId, RemIdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RemIdError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Checks a key read from storage or import without rewriting it.
///
/// Stored keys must already be in normalized form, so a key that differs
/// from its trimmed value is rejected rather than silently renamed.
pub fn validate_stored_rem_id(value: &str) -> Result<(), RemIdError> {
    if normalize_rem_id(value)? != value {
        return Err(RemIdError::Untrimmed(value.to_string()));
    }
    Ok(())
}

/// Full mapping of rem identifier to attempt history.
///
/// Serialized as `{ "<remId>": { "attempts": [...] } }`. Deserialization
/// rejects blank or untrimmed keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<RemId, RemRecord>")]
pub struct Database {
    records: BTreeMap<RemId, RemRecord>,
}

impl Serialize for Database {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl TryFrom<BTreeMap<RemId, RemRecord>> for Database {
    type Error = RemIdError;

    fn try_from(records: BTreeMap<RemId, RemRecord>) -> Result<Self, Self::Error> {
        for rem_id in records.keys() {
            validate_stored_rem_id(rem_id)?;
        }
        Ok(Self { records })
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, rem_id: &str) -> Option<&RemRecord> {
        self.records.get(rem_id)
    }

    pub fn contains(&self, rem_id: &str) -> bool {
        self.records.contains_key(rem_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemRecord)> {
        self.records
            .iter()
            .map(|(rem_id, record)| (rem_id.as_str(), record))
    }

    /// Appends an attempt, creating the record lazily on first use.
    pub fn append_attempt(&mut self, rem_id: RemId, attempt: Attempt) -> &RemRecord {
        let record = self.records.entry(rem_id).or_default();
        record.push_attempt(attempt);
        record
    }

    /// Inserts or fully replaces the record stored under `rem_id`.
    pub fn insert_record(&mut self, rem_id: RemId, record: RemRecord) -> Option<RemRecord> {
        self.records.insert(rem_id, record)
    }

    /// Removes the record entirely. Returns the removed record, if any.
    pub fn remove(&mut self, rem_id: &str) -> Option<RemRecord> {
        self.records.remove(rem_id)
    }

    /// Overwrites local entries with every entry of `incoming`.
    ///
    /// Returns how many incoming keys replaced an existing record.
    pub fn merge_overwrite(&mut self, incoming: Database) -> usize {
        let mut replaced = 0;
        for (rem_id, record) in incoming.records {
            if self.records.insert(rem_id, record).is_some() {
                replaced += 1;
            }
        }
        replaced
    }

    /// Iterates every attempt of every rem. Order across rems is unspecified.
    pub fn all_attempts(&self) -> impl Iterator<Item = &Attempt> {
        self.records.values().flat_map(|record| record.attempts.iter())
    }

    pub fn total_attempts(&self) -> usize {
        self.records.values().map(|record| record.attempts.len()).sum()
    }

    /// Accuracy over the concatenation of every rem's attempts.
    pub fn overall_accuracy(&self) -> u32 {
        let correct = self.all_attempts().filter(|attempt| attempt.correct).count();
        accuracy_from_counts(correct, self.total_attempts())
    }
}

impl FromIterator<(RemId, RemRecord)> for Database {
    fn from_iter<T: IntoIterator<Item = (RemId, RemRecord)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
