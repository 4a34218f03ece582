//! Runtime configuration and host query parsing.
//!
//! # Responsibility
//! - Collect storage key, log and store locations from defaults and the
//!   environment.
//! - Extract a startup rem identifier from a host-supplied query string.
//!
//! # Invariants
//! - A validated config always has a non-empty storage key and absolute
//!   log directory (when set).

use crate::logging::{default_log_level, normalize_level};
use crate::model::database::{normalize_rem_id, RemId};
use crate::storage::DEFAULT_STORAGE_KEY;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "REMTRACK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REMTRACK_LOG_DIR";
pub const ENV_DB_PATH: &str = "REMTRACK_DB_PATH";
pub const ENV_HOST_STORE: &str = "REMTRACK_HOST_STORE";
pub const ENV_STORAGE_KEY: &str = "REMTRACK_STORAGE_KEY";

/// `REMTRACK_DB_PATH` value that selects a non-durable in-memory local store.
pub const LOCAL_DB_IN_MEMORY: &str = ":memory:";

/// Query parameter names checked for a startup rem id, in priority order.
const REM_QUERY_KEYS: &[&str] = &["remId", "rem"];

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyStorageKey,
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStorageKey => write!(f, "storage key cannot be empty"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(path) => {
                write!(f, "log dir must be an absolute path, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

/// Tracker runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub storage_key: String,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    /// Local fallback store file; in-memory (and reported as such) when `None`.
    pub local_db_path: Option<PathBuf>,
    /// Host capability file; no host backend when `None`.
    pub host_store_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            local_db_path: default_local_db_path(),
            host_store_path: None,
        }
    }
}

/// `<data_local_dir>/remtrack/remtrack.sqlite3`, when the platform has one.
pub fn default_local_db_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("remtrack").join("remtrack.sqlite3"))
}

/// Maps a user-supplied local store location to a config value.
///
/// `:memory:` selects the in-memory store.
pub fn local_db_path_from_arg(raw: &str) -> Option<PathBuf> {
    match raw.trim() {
        LOCAL_DB_IN_MEMORY => None,
        path => Some(PathBuf::from(path)),
    }
}

impl TrackerConfig {
    /// Defaults overridden by `REMTRACK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by values returned from `lookup`.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = Self::default();
        if let Some(key) = value(ENV_STORAGE_KEY) {
            config.storage_key = key;
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = value(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(path) = value(ENV_DB_PATH) {
            config.local_db_path = local_db_path_from_arg(&path);
        }
        config.host_store_path = value(ENV_HOST_STORE).map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}

/// Extracts the startup rem id from a URL query string.
///
/// Accepts a leading `?`. `remId` wins over `rem`; blank values are ignored.
pub fn rem_id_from_query(query: &str) -> Option<RemId> {
    let query = query.trim().trim_start_matches('?');
    let pairs = url::form_urlencoded::parse(query.as_bytes()).collect::<Vec<_>>();

    REM_QUERY_KEYS.iter().find_map(|wanted| {
        pairs
            .iter()
            .filter(|(key, _)| key == wanted)
            .find_map(|(_, value)| normalize_rem_id(value).ok())
    })
}
