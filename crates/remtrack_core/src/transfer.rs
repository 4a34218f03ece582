//! JSON export/import codec for the persisted database shape.
//!
//! # Responsibility
//! - Serialize the database as pretty-printed JSON for file export.
//! - Parse and shape-check incoming JSON before it can reach the store.
//!
//! # Invariants
//! - Parsing is all-or-nothing: a single malformed record rejects the input.
//! - Unknown extra fields are ignored; missing required fields are not.

use crate::model::attempt::RemRecord;
use crate::model::database::{validate_stored_rem_id, Database, RemIdError};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Suggested file name for exported data.
pub const EXPORT_FILE_NAME: &str = "remnote-accuracy.json";
/// MIME type of exported data.
pub const EXPORT_MIME_TYPE: &str = "application/json";

/// Import input rejection reasons.
#[derive(Debug)]
pub enum ParseError {
    /// Input is not valid JSON.
    Json(serde_json::Error),
    /// Root value is not a JSON object.
    NotAnObject,
    /// A top-level key is empty or whitespace.
    EmptyRemId,
    /// A top-level key has leading or trailing whitespace.
    InvalidRemId(String),
    /// A record does not match `{ "attempts": [{ "correct", "ts" }] }`.
    InvalidRecord {
        rem_id: String,
        source: serde_json::Error,
    },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid JSON: {err}"),
            Self::NotAnObject => write!(f, "expected a JSON object keyed by rem id"),
            Self::EmptyRemId => write!(f, "rem id keys cannot be empty"),
            Self::InvalidRemId(rem_id) => {
                write!(f, "rem id key `{rem_id}` has leading or trailing whitespace")
            }
            Self::InvalidRecord { rem_id, source } => {
                write!(f, "invalid record for rem `{rem_id}`: {source}")
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidRecord { source, .. } => Some(source),
            Self::NotAnObject | Self::EmptyRemId | Self::InvalidRemId(_) => None,
        }
    }
}

/// Exported file payload handed to the file-save collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    /// UTF-8 JSON text.
    pub contents: Vec<u8>,
}

impl ExportFile {
    pub fn as_text(&self) -> &str {
        // Contents are always produced from a `String`.
        std::str::from_utf8(&self.contents).unwrap_or_default()
    }
}

/// Serializes the database as 2-space pretty-printed JSON.
pub fn export_pretty(db: &Database) -> serde_json::Result<String> {
    serde_json::to_string_pretty(db)
}

/// Builds the export file payload for the whole database.
pub fn export_file(db: &Database) -> serde_json::Result<ExportFile> {
    Ok(ExportFile {
        file_name: EXPORT_FILE_NAME,
        mime_type: EXPORT_MIME_TYPE,
        contents: export_pretty(db)?.into_bytes(),
    })
}

/// Parses serialized database text.
pub fn parse_database(text: &str) -> Result<Database, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(ParseError::Json)?;
    database_from_value(value)
}

/// Shape-checks a structured value and converts it to a database.
pub fn database_from_value(value: Value) -> Result<Database, ParseError> {
    let Value::Object(entries) = value else {
        return Err(ParseError::NotAnObject);
    };

    entries
        .into_iter()
        .map(|(rem_id, record)| {
            match validate_stored_rem_id(&rem_id) {
                Ok(()) => {}
                Err(RemIdError::Empty) => return Err(ParseError::EmptyRemId),
                Err(RemIdError::Untrimmed(_)) => return Err(ParseError::InvalidRemId(rem_id)),
            }
            match serde_json::from_value::<RemRecord>(record) {
                Ok(record) => Ok((rem_id, record)),
                Err(source) => Err(ParseError::InvalidRecord { rem_id, source }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{export_file, export_pretty, parse_database, ParseError, EXPORT_FILE_NAME};
    use crate::model::attempt::Attempt;
    use crate::model::database::Database;

    fn sample_db() -> Database {
        let mut db = Database::new();
        db.append_attempt("b".to_string(), Attempt::new(false, 2));
        db.append_attempt("a".to_string(), Attempt::new(true, 1));
        db
    }

    #[test]
    fn export_is_pretty_and_sorted_by_rem_id() {
        let text = export_pretty(&sample_db()).expect("export");
        let expected = r#"{
  "a": {
    "attempts": [
      {
        "correct": true,
        "ts": 1
      }
    ]
  },
  "b": {
    "attempts": [
      {
        "correct": false,
        "ts": 2
      }
    ]
  }
}"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn export_file_carries_name_and_mime() {
        let file = export_file(&Database::new()).expect("export");
        assert_eq!(file.file_name, EXPORT_FILE_NAME);
        assert_eq!(file.mime_type, "application/json");
        assert_eq!(file.as_text(), "{}");
    }

    #[test]
    fn parse_accepts_exported_text() {
        let text = export_pretty(&sample_db()).expect("export");
        assert_eq!(parse_database(&text).expect("parse"), sample_db());
    }

    #[test]
    fn parse_ignores_unknown_fields() {
        let db = parse_database(r#"{"r": {"attempts": [{"correct": true, "ts": 3, "x": 1}], "note": "hi"}}"#)
            .expect("extra fields are tolerated");
        assert_eq!(db.get("r").map(|record| record.attempts.len()), Some(1));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(parse_database("{"), Err(ParseError::Json(_))));
        assert!(matches!(parse_database("[]"), Err(ParseError::NotAnObject)));
        assert!(matches!(
            parse_database(r#"{"  ": {"attempts": []}}"#),
            Err(ParseError::EmptyRemId)
        ));
        assert!(matches!(
            parse_database(r#"{" r ": {"attempts": []}}"#),
            Err(ParseError::InvalidRemId(key)) if key == " r "
        ));
        assert!(matches!(
            parse_database(r#"{"r": {}}"#),
            Err(ParseError::InvalidRecord { .. })
        ));
        assert!(matches!(
            parse_database(r#"{"r": {"attempts": [{"correct": "yes", "ts": 1}]}}"#),
            Err(ParseError::InvalidRecord { .. })
        ));
        assert!(matches!(
            parse_database(r#"{"r": {"attempts": [{"correct": true, "ts": 1.5}]}}"#),
            Err(ParseError::InvalidRecord { .. })
        ));
    }
}
