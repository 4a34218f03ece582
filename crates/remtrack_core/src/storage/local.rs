//! Local fallback store backed by the SQLite key-value table.
//!
//! # Invariants
//! - Values are stored as compact JSON text of the full database.
//! - Writes upsert the single row for the key; there is no partial write.

use super::{BackendError, BackendResult, StorageBackend};
use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::database::Database;
use crate::transfer::parse_database;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Local key-value store used when the host store is absent or failing.
pub struct LocalBackend {
    conn: Mutex<Connection>,
    durable: bool,
}

impl LocalBackend {
    /// Opens (or creates) a file-backed local store, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(DbError::Io)?;
        }
        Ok(Self {
            conn: Mutex::new(open_db(path)?),
            durable: true,
        })
    }

    /// Opens a process-lifetime in-memory local store. Not durable.
    pub fn in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db_in_memory()?),
            durable: false,
        })
    }

    /// Returns the raw stored text for `key`.
    pub fn get_raw(&self, key: &str) -> BackendResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes raw text under `key`, replacing any previous value.
    pub fn set_raw(&self, key: &str, value: &str) -> BackendResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BackendError::Poisoned("local store connection"))
    }
}

impl StorageBackend for LocalBackend {
    fn backend_id(&self) -> &str {
        "local"
    }

    fn is_available(&self) -> bool {
        !self.conn.is_poisoned()
    }

    fn is_durable(&self) -> bool {
        self.durable
    }

    fn load(&self, key: &str) -> BackendResult<Option<Database>> {
        match self.get_raw(key)? {
            Some(text) => Ok(Some(parse_database(&text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, db: &Database) -> BackendResult<()> {
        let text = serde_json::to_string(db).map_err(BackendError::Encode)?;
        self.set_raw(key, &text)
    }
}
