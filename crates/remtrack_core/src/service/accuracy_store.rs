//! Accuracy store: in-memory dataset synchronized with the storage adapter.
//!
//! # Responsibility
//! - Load the database once and keep it as the single source of truth.
//! - Apply record/reset/import mutations and persist the full database
//!   after each one.
//! - Expose per-rem and overall accuracy summaries.
//!
//! # Invariants
//! - Mutations are applied to memory first, then persisted; the outcome of
//!   the write is kept in `last_persist_status`, never raised as an error.
//! - Input and format errors abort the operation before any state change.
//! - Before `load()` the store reads as an empty database.

use crate::logging::rem_ref;
use crate::model::attempt::{accuracy_from_counts, Attempt, RemRecord};
use crate::model::database::{normalize_rem_id, Database, RemIdError};
use crate::storage::{PersistStatus, StorageAdapter};
use crate::transfer::{export_file, export_pretty, parse_database, ExportFile, ParseError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Caller-visible failures. Storage failures are deliberately absent.
#[derive(Debug)]
pub enum TrackerError {
    /// No usable rem identifier was supplied.
    InvalidInput(RemIdError),
    /// Import data is not a well-formed serialized database.
    Parse(ParseError),
    /// The database could not be serialized for export.
    Export(serde_json::Error),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::Parse(err) => write!(f, "import failed: {err}"),
            Self::Export(err) => write!(f, "export failed: {err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<RemIdError> for TrackerError {
    fn from(value: RemIdError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<ParseError> for TrackerError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

/// Aggregated counts and rounded percentage for a set of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccuracySummary {
    pub attempts: usize,
    pub correct: usize,
    /// Rounded percentage, 0 when `attempts == 0`.
    pub accuracy: u32,
}

impl AccuracySummary {
    pub fn from_counts(correct: usize, attempts: usize) -> Self {
        Self {
            attempts,
            correct,
            accuracy: accuracy_from_counts(correct, attempts),
        }
    }

    pub fn of_record(record: &RemRecord) -> Self {
        Self::from_counts(record.correct_count(), record.attempts.len())
    }
}

/// Result of one import merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Number of rem records in the incoming data.
    pub imported: usize,
    /// How many of them replaced an existing record.
    pub replaced: usize,
}

/// In-memory database plus its persistence cycle.
pub struct AccuracyStore {
    storage: StorageAdapter,
    db: Database,
    loaded: bool,
    last_persist: PersistStatus,
}

impl AccuracyStore {
    /// Creates an unloaded store. Call `load()` before serving reads.
    pub fn new(storage: StorageAdapter) -> Self {
        Self {
            storage,
            db: Database::new(),
            loaded: false,
            last_persist: PersistStatus::NotAttempted,
        }
    }

    /// Creates a store and loads it immediately.
    pub fn open(storage: StorageAdapter) -> Self {
        let mut store = Self::new(storage);
        store.load();
        store
    }

    /// Replaces in-memory state wholesale with the stored database.
    pub fn load(&mut self) {
        self.db = self.storage.get();
        self.loaded = true;
        info!(
            "event=store_load module=service status=ok rems={} attempts={}",
            self.db.len(),
            self.db.total_attempts()
        );
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Outcome of the most recent write.
    pub fn last_persist_status(&self) -> &PersistStatus {
        &self.last_persist
    }

    /// Records an attempt stamped with the current wall clock.
    pub fn record_attempt(&mut self, rem_id: &str, correct: bool) -> TrackerResult<AccuracySummary> {
        self.record_attempt_at(rem_id, correct, now_epoch_ms())
    }

    /// Records an attempt with an explicit epoch-millisecond timestamp.
    ///
    /// # Errors
    /// - `InvalidInput` when `rem_id` is blank; state is left untouched.
    pub fn record_attempt_at(
        &mut self,
        rem_id: &str,
        correct: bool,
        timestamp: i64,
    ) -> TrackerResult<AccuracySummary> {
        let rem_id = match normalize_rem_id(rem_id) {
            Ok(rem_id) => rem_id,
            Err(err) => {
                warn!("event=record_attempt module=service status=rejected error_code=empty_rem_id");
                return Err(err.into());
            }
        };

        let summary = {
            let record = self
                .db
                .append_attempt(rem_id.clone(), Attempt::new(correct, timestamp));
            AccuracySummary::of_record(record)
        };
        info!(
            "event=record_attempt module=service status=ok rem={} correct={} attempts={}",
            rem_ref(&rem_id),
            correct,
            summary.attempts
        );
        self.persist();
        Ok(summary)
    }

    /// Deletes the rem's record entirely. Absent rems are a no-op.
    ///
    /// Returns whether a record was removed. Persists in both cases.
    pub fn reset_rem(&mut self, rem_id: &str) -> TrackerResult<bool> {
        let rem_id = normalize_rem_id(rem_id)?;
        let removed = self.db.remove(&rem_id).is_some();
        info!(
            "event=reset_rem module=service status=ok rem={} removed={}",
            rem_ref(&rem_id),
            removed
        );
        self.persist();
        Ok(removed)
    }

    /// Overwrites local records with every incoming record, key by key.
    ///
    /// Attempt histories are replaced wholesale, never unioned. Keys absent
    /// from `incoming` stay untouched.
    pub fn import_merge(&mut self, incoming: Database) -> ImportReport {
        let imported = incoming.len();
        let replaced = self.db.merge_overwrite(incoming);
        info!(
            "event=import_merge module=service status=ok imported={} replaced={} rems={}",
            imported,
            replaced,
            self.db.len()
        );
        self.persist();
        ImportReport { imported, replaced }
    }

    /// Parses serialized database text and merges it.
    ///
    /// # Errors
    /// - `Parse` when the text is malformed; nothing is merged or persisted.
    pub fn import_json(&mut self, text: &str) -> TrackerResult<ImportReport> {
        let incoming = match parse_database(text) {
            Ok(incoming) => incoming,
            Err(err) => {
                warn!("event=import_merge module=service status=rejected error={err}");
                return Err(err.into());
            }
        };
        Ok(self.import_merge(incoming))
    }

    /// Pretty-printed JSON of the whole database. Read-only.
    pub fn export_json(&self) -> TrackerResult<String> {
        export_pretty(&self.db).map_err(TrackerError::Export)
    }

    /// Export payload for the file-save collaborator. Read-only.
    pub fn export_file(&self) -> TrackerResult<ExportFile> {
        export_file(&self.db).map_err(TrackerError::Export)
    }

    /// Summary for one rem; zeros when the rem has no record.
    pub fn rem_summary(&self, rem_id: &str) -> AccuracySummary {
        self.db
            .get(rem_id.trim())
            .map(AccuracySummary::of_record)
            .unwrap_or_default()
    }

    /// Summary over every attempt of every rem.
    pub fn overall_summary(&self) -> AccuracySummary {
        let correct = self.db.all_attempts().filter(|attempt| attempt.correct).count();
        AccuracySummary::from_counts(correct, self.db.total_attempts())
    }

    fn persist(&mut self) {
        self.last_persist = self.storage.set(&self.db);
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{now_epoch_ms, AccuracyStore, AccuracySummary};
    use crate::storage::{LocalBackend, StorageAdapter};
    use std::sync::Arc;

    fn memory_store() -> AccuracyStore {
        let local = LocalBackend::in_memory().expect("local store");
        AccuracyStore::open(StorageAdapter::new("test:v1").with_backend(Arc::new(local)))
    }

    #[test]
    fn unloaded_store_reads_empty() {
        let store = AccuracyStore::new(StorageAdapter::new("test:v1"));
        assert!(!store.is_loaded());
        assert!(store.database().is_empty());
        assert_eq!(store.overall_summary(), AccuracySummary::default());
    }

    #[test]
    fn record_attempt_uses_current_time() {
        let mut store = memory_store();
        let before = now_epoch_ms();
        store.record_attempt("r1", true).expect("record");
        let after = now_epoch_ms();

        let ts = store
            .database()
            .get("r1")
            .expect("record")
            .last_attempt()
            .expect("attempt")
            .timestamp;
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn record_attempt_trims_rem_id() {
        let mut store = memory_store();
        store.record_attempt_at("  r1 ", false, 1).expect("record");
        assert!(store.database().contains("r1"));
        assert_eq!(store.rem_summary(" r1").attempts, 1);
    }

    #[test]
    fn summary_counts_match_accuracy() {
        assert_eq!(
            AccuracySummary::from_counts(3, 4),
            AccuracySummary {
                attempts: 4,
                correct: 3,
                accuracy: 75
            }
        );
    }
}
