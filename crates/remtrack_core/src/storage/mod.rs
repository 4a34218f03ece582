//! Storage adapter layer with an ordered backend fallback chain.
//!
//! # Responsibility
//! - Define the uniform backend contract shared by the host-provided store
//!   and the local fallback store.
//! - Resolve backends in priority order on every call, translating backend
//!   failures into fallback instead of caller-visible errors.
//!
//! # Invariants
//! - No backend selection is cached between calls.
//! - `StorageAdapter::get` never fails; `StorageAdapter::set` reports a
//!   `PersistStatus` instead of an error.
//! - Every backend addresses the database by the same versioned key.

use crate::db::DbError;
use crate::model::database::Database;
use crate::transfer::ParseError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod adapter;
mod host;
mod local;

pub use adapter::{PersistStatus, StorageAdapter};
pub use host::{HostBackend, HostStorage, HostStorageError, JsonFileHostStorage};
pub use local::LocalBackend;

/// Fixed versioned key used by every backend.
pub const DEFAULT_STORAGE_KEY: &str = "remnote-accuracy-tracker:v1";

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure raised by one backend. Always recovered by the adapter.
#[derive(Debug)]
pub enum BackendError {
    Host(HostStorageError),
    Local(DbError),
    Decode(ParseError),
    Encode(serde_json::Error),
    Poisoned(&'static str),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host(err) => write!(f, "host storage failed: {err}"),
            Self::Local(err) => write!(f, "local storage failed: {err}"),
            Self::Decode(err) => write!(f, "stored value is not a valid database: {err}"),
            Self::Encode(err) => write!(f, "failed to encode database: {err}"),
            Self::Poisoned(what) => write!(f, "{what} lock poisoned"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            Self::Local(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Poisoned(_) => None,
        }
    }
}

impl From<HostStorageError> for BackendError {
    fn from(value: HostStorageError) -> Self {
        Self::Host(value)
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Local(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Local(DbError::Sqlite(value))
    }
}

impl From<ParseError> for BackendError {
    fn from(value: ParseError) -> Self {
        Self::Decode(value)
    }
}

/// Uniform contract for one durable key-value blob store.
pub trait StorageBackend: Send + Sync {
    /// Stable short id used in logs and persistence status.
    fn backend_id(&self) -> &str;

    /// Capability check. Evaluated on every adapter call.
    fn is_available(&self) -> bool;

    /// Whether accepted writes outlive the process.
    fn is_durable(&self) -> bool {
        true
    }

    /// Reads the database stored under `key`. `Ok(None)` means no value yet.
    fn load(&self, key: &str) -> BackendResult<Option<Database>>;

    /// Replaces the value stored under `key` with the full database.
    fn save(&self, key: &str, db: &Database) -> BackendResult<()>;
}
