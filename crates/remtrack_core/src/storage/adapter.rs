//! Ordered backend chain with per-call capability probing.

use super::{
    HostBackend, HostStorage, JsonFileHostStorage, LocalBackend, StorageBackend,
    DEFAULT_STORAGE_KEY,
};
use crate::config::TrackerConfig;
use crate::model::database::Database;
use log::{debug, error, warn};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Outcome of the most recent write through the adapter.
///
/// This is the status channel that lets callers tell "persisted" from
/// "lost" without turning storage failures into errors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PersistStatus {
    /// No write has been attempted yet.
    #[default]
    NotAttempted,
    /// One durable backend accepted the write.
    Persisted {
        backend_id: String,
        /// A higher-priority backend failed before this one succeeded.
        fell_back: bool,
    },
    /// Only a non-durable backend accepted the write; it ends with the process.
    Volatile { backend_id: String, fell_back: bool },
    /// Every available backend failed; the write was dropped.
    Lost,
}

impl PersistStatus {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }

    /// Short label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAttempted => "idle",
            Self::Persisted {
                fell_back: false, ..
            } => "saved",
            Self::Persisted {
                fell_back: true, ..
            } => "saved (fallback)",
            Self::Volatile {
                fell_back: false, ..
            } => "memory only",
            Self::Volatile {
                fell_back: true, ..
            } => "memory only (fallback)",
            Self::Lost => "not saved",
        }
    }
}

impl Display for PersistStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persisted { backend_id, .. } | Self::Volatile { backend_id, .. } => {
                write!(f, "{} via {backend_id}", self.label())
            }
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Durable key-value store abstraction over an ordered list of backends.
pub struct StorageAdapter {
    key: String,
    backends: Vec<Arc<dyn StorageBackend>>,
}

impl StorageAdapter {
    /// Creates an adapter with no backends, addressing `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            backends: Vec::new(),
        }
    }

    /// Standard chain: optional host capability first, then the local store.
    pub fn standard(host: Option<Arc<dyn HostStorage>>, local: Option<LocalBackend>) -> Self {
        let mut adapter =
            Self::new(DEFAULT_STORAGE_KEY).with_backend(Arc::new(HostBackend::new(host)));
        if let Some(local) = local {
            adapter = adapter.with_backend(Arc::new(local));
        }
        adapter
    }

    /// Builds the standard chain described by `config`.
    ///
    /// Without `local_db_path` the local store lives in memory and writes
    /// report `PersistStatus::Volatile`. A local store that cannot be opened
    /// is left out of the chain; writes then report `PersistStatus::Lost`
    /// instead of failing startup.
    pub fn from_config(config: &TrackerConfig) -> Self {
        let host = config
            .host_store_path
            .as_ref()
            .map(|path| Arc::new(JsonFileHostStorage::new(path)) as Arc<dyn HostStorage>);
        let local = match &config.local_db_path {
            Some(path) => LocalBackend::open(path),
            None => LocalBackend::in_memory(),
        };
        let local = match local {
            Ok(local) => Some(local),
            Err(err) => {
                error!(
                    "event=storage_init module=storage status=error backend=local error={}",
                    err
                );
                None
            }
        };

        let mut adapter = Self::standard(host, local);
        adapter.key = config.storage_key.clone();
        adapter
    }

    /// Appends a backend with the lowest priority so far.
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|backend| backend.backend_id().to_string())
            .collect()
    }

    /// Reads the database from the first backend that answers.
    ///
    /// A backend that answers with no stored value yields an empty database.
    /// Backend errors fall through to the next backend; when nothing answers
    /// the result is an empty database.
    pub fn get(&self) -> Database {
        for backend in self.available_backends() {
            match backend.load(&self.key) {
                Ok(Some(db)) => {
                    debug!(
                        "event=storage_get module=storage status=ok backend={} rems={}",
                        backend.backend_id(),
                        db.len()
                    );
                    return db;
                }
                Ok(None) => {
                    debug!(
                        "event=storage_get module=storage status=empty backend={}",
                        backend.backend_id()
                    );
                    return Database::new();
                }
                Err(err) => {
                    warn!(
                        "event=storage_get module=storage status=fallback backend={} error={}",
                        backend.backend_id(),
                        err
                    );
                }
            }
        }

        warn!("event=storage_get module=storage status=unavailable fallback=empty_database");
        Database::new()
    }

    /// Writes the full database to the first backend that accepts it.
    pub fn set(&self, db: &Database) -> PersistStatus {
        let mut fell_back = false;
        for backend in self.available_backends() {
            match backend.save(&self.key, db) {
                Ok(()) => {
                    debug!(
                        "event=storage_set module=storage status=ok backend={} rems={} fell_back={}",
                        backend.backend_id(),
                        db.len(),
                        fell_back
                    );
                    let backend_id = backend.backend_id().to_string();
                    if !backend.is_durable() {
                        warn!(
                            "event=storage_set module=storage status=volatile backend={}",
                            backend_id
                        );
                        return PersistStatus::Volatile {
                            backend_id,
                            fell_back,
                        };
                    }
                    return PersistStatus::Persisted {
                        backend_id,
                        fell_back,
                    };
                }
                Err(err) => {
                    warn!(
                        "event=storage_set module=storage status=fallback backend={} error={}",
                        backend.backend_id(),
                        err
                    );
                    fell_back = true;
                }
            }
        }

        error!(
            "event=storage_set module=storage status=lost rems={} error_code=all_backends_failed",
            db.len()
        );
        PersistStatus::Lost
    }

    fn available_backends(&self) -> impl Iterator<Item = &Arc<dyn StorageBackend>> {
        self.backends.iter().filter(|backend| backend.is_available())
    }
}
