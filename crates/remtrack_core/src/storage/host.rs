//! Host-provided storage capability and its backend adapter.

use super::{BackendError, BackendResult, StorageBackend};
use crate::model::database::Database;
use crate::transfer::database_from_value;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Error reported by a host storage capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStorageError {
    message: String,
}

impl HostStorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for HostStorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for HostStorageError {}

/// Key-value capability optionally supplied by the surrounding runtime.
///
/// Values are structured JSON, not serialized text.
pub trait HostStorage: Send + Sync {
    /// Whether the capability is usable right now.
    fn is_ready(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<Value>, HostStorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), HostStorageError>;
}

/// Adapts an optional host capability to the backend contract.
///
/// An absent capability makes the backend unavailable, so the chain moves on.
#[derive(Clone, Default)]
pub struct HostBackend {
    host: Option<Arc<dyn HostStorage>>,
}

impl HostBackend {
    pub fn new(host: Option<Arc<dyn HostStorage>>) -> Self {
        Self { host }
    }

    pub fn with_host(host: Arc<dyn HostStorage>) -> Self {
        Self { host: Some(host) }
    }

    pub fn absent() -> Self {
        Self { host: None }
    }

    fn ready_host(&self) -> Option<&Arc<dyn HostStorage>> {
        self.host.as_ref().filter(|host| host.is_ready())
    }
}

impl StorageBackend for HostBackend {
    fn backend_id(&self) -> &str {
        "host"
    }

    fn is_available(&self) -> bool {
        self.ready_host().is_some()
    }

    fn load(&self, key: &str) -> BackendResult<Option<Database>> {
        let Some(host) = self.ready_host() else {
            return Ok(None);
        };
        match host.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(database_from_value(value)?)),
        }
    }

    fn save(&self, key: &str, db: &Database) -> BackendResult<()> {
        let Some(host) = self.ready_host() else {
            return Err(HostStorageError::new("host storage is not available").into());
        };
        let value = serde_json::to_value(db).map_err(BackendError::Encode)?;
        host.set(key, value)?;
        Ok(())
    }
}

/// Host capability persisted as one JSON object file (`key -> value`).
///
/// Ready only while the parent directory exists.
pub struct JsonFileHostStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileHostStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<Map<String, Value>, HostStorageError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(HostStorageError::new(format!(
                    "failed to read `{}`: {err}",
                    self.path.display()
                )))
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(HostStorageError::new(format!(
                "`{}` does not contain a JSON object",
                self.path.display()
            ))),
            Err(err) => Err(HostStorageError::new(format!(
                "`{}` is not valid JSON: {err}",
                self.path.display()
            ))),
        }
    }
}

impl JsonFileHostStorage {
    /// Writes a sibling temp file and renames it over the target, so a
    /// failed write leaves the previous file intact.
    fn replace_file(&self, contents: &[u8]) -> Result<(), HostStorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|err| {
            HostStorageError::new(format!(
                "failed to create temp file in `{}`: {err}",
                dir.display()
            ))
        })?;
        temp.write_all(contents)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|err| HostStorageError::new(format!("failed to write temp file: {err}")))?;
        temp.persist(&self.path).map_err(|err| {
            HostStorageError::new(format!(
                "failed to replace `{}`: {}",
                self.path.display(),
                err.error
            ))
        })?;
        Ok(())
    }
}

impl HostStorage for JsonFileHostStorage {
    fn is_ready(&self) -> bool {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        }
    }

    fn get(&self, key: &str) -> Result<Option<Value>, HostStorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), HostStorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| HostStorageError::new("host file lock poisoned"))?;
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value);
        let text = serde_json::to_string_pretty(&Value::Object(entries))
            .map_err(|err| HostStorageError::new(format!("failed to encode entries: {err}")))?;
        self.replace_file(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::{HostBackend, HostStorage, JsonFileHostStorage};
    use crate::model::attempt::Attempt;
    use crate::model::database::Database;
    use crate::storage::StorageBackend;
    use std::sync::Arc;

    #[test]
    fn absent_host_is_unavailable() {
        let backend = HostBackend::absent();
        assert!(!backend.is_available());
        assert!(backend.save("k", &Database::new()).is_err());
    }

    #[test]
    fn json_file_host_roundtrips_database_and_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.json");
        std::fs::write(&path, r#"{"other:key": 7}"#).expect("seed host file");
        let host = Arc::new(JsonFileHostStorage::new(&path));
        let backend = HostBackend::with_host(host.clone());

        let mut db = Database::new();
        db.append_attempt("r1".to_string(), Attempt::new(true, 1));
        backend.save("tracker", &db).expect("save should succeed");

        let loaded = backend.load("tracker").expect("load should succeed");
        assert_eq!(loaded, Some(db));
        assert_eq!(
            host.get("other:key").expect("get other key"),
            Some(serde_json::json!(7))
        );
    }

    #[test]
    fn json_file_host_set_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.json");
        let host = JsonFileHostStorage::new(&path);

        host.set("a", serde_json::json!(1)).expect("first set");
        host.set("b", serde_json::json!(2)).expect("second set");

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("dir entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("host.json")]);
        let stored: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read host file"))
                .expect("host file is JSON");
        assert_eq!(stored, serde_json::json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn json_file_host_set_into_missing_dir_fails_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone").join("host.json");
        let host = JsonFileHostStorage::new(&path);

        assert!(!host.is_ready());
        assert!(host.set("a", serde_json::json!(1)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn json_file_host_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend =
            HostBackend::with_host(Arc::new(JsonFileHostStorage::new(dir.path().join("none.json"))));
        assert!(backend.is_available());
        assert_eq!(backend.load("tracker").expect("load"), None);
    }

    #[test]
    fn json_file_host_is_not_ready_without_parent_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = JsonFileHostStorage::new(dir.path().join("missing").join("host.json"));
        assert!(!host.is_ready());
    }
}
