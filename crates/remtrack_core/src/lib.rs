//! Core domain logic for the rem accuracy tracker.
//! This crate is the single source of truth for tracking invariants.

pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod transfer;

pub use config::{
    default_local_db_path, local_db_path_from_arg, rem_id_from_query, ConfigError, TrackerConfig,
};
pub use controller::{ActionResponse, TrackerController, WidgetView};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attempt::{compute_accuracy, Attempt, RemRecord};
pub use model::database::{normalize_rem_id, Database, RemId, RemIdError};
pub use service::accuracy_store::{
    AccuracyStore, AccuracySummary, ImportReport, TrackerError, TrackerResult,
};
pub use storage::{
    HostBackend, HostStorage, HostStorageError, JsonFileHostStorage, LocalBackend, PersistStatus,
    StorageAdapter, StorageBackend, DEFAULT_STORAGE_KEY,
};
pub use transfer::{ExportFile, ParseError, EXPORT_FILE_NAME, EXPORT_MIME_TYPE};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
