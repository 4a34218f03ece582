//! Widget-facing controller over the accuracy store.
//!
//! # Responsibility
//! - Track the currently selected rem identifier.
//! - Translate user actions into store calls and UI-ready envelopes.
//!
//! # Invariants
//! - Actions never panic; failures come back as `ok == false` responses.
//! - Rendering is left to callers; `view()` is a plain snapshot.

use crate::config::rem_id_from_query;
use crate::model::database::{normalize_rem_id, RemId};
use crate::service::accuracy_store::{AccuracyStore, AccuracySummary, TrackerError};
use crate::transfer::ExportFile;

const MISSING_REM_MESSAGE: &str = "Set a rem id first.";

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Human-readable message for inline display.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Snapshot of everything the widget displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub current_rem: Option<RemId>,
    /// `None` when no rem is selected.
    pub rem: Option<AccuracySummary>,
    pub overall: AccuracySummary,
    pub tracked_rems: usize,
    pub persistence: String,
    pub last_message: Option<String>,
}

pub struct TrackerController {
    store: AccuracyStore,
    current_rem: Option<RemId>,
    last_message: Option<String>,
}

impl TrackerController {
    /// Wraps a store. `query` is the host-supplied query string, if any.
    pub fn new(store: AccuracyStore, query: Option<&str>) -> Self {
        Self {
            store,
            current_rem: query.and_then(rem_id_from_query),
            last_message: None,
        }
    }

    pub fn store(&self) -> &AccuracyStore {
        &self.store
    }

    pub fn current_rem(&self) -> Option<&str> {
        self.current_rem.as_deref()
    }

    /// Manual identifier entry. A blank value clears the selection.
    pub fn set_current_rem(&mut self, rem_id: &str) -> ActionResponse {
        let response = match normalize_rem_id(rem_id) {
            Ok(rem_id) => {
                let message = format!("Tracking rem {rem_id}.");
                self.current_rem = Some(rem_id);
                ActionResponse::success(message)
            }
            Err(_) => {
                self.current_rem = None;
                ActionResponse::failure(MISSING_REM_MESSAGE)
            }
        };
        self.remember(response)
    }

    pub fn mark_correct(&mut self) -> ActionResponse {
        self.record(true)
    }

    pub fn mark_incorrect(&mut self) -> ActionResponse {
        self.record(false)
    }

    /// Clears the current rem's history.
    pub fn reset_current(&mut self) -> ActionResponse {
        let rem_id = self.current_rem.clone().unwrap_or_default();
        let response = match self.store.reset_rem(&rem_id) {
            Ok(true) => ActionResponse::success(format!("Reset rem {rem_id}.")),
            Ok(false) => ActionResponse::success(format!("Rem {rem_id} had no attempts.")),
            Err(TrackerError::InvalidInput(_)) => ActionResponse::failure(MISSING_REM_MESSAGE),
            Err(err) => ActionResponse::failure(err.to_string()),
        };
        self.remember(response)
    }

    /// Builds the export payload; `None` when serialization fails.
    pub fn export_file(&mut self) -> Option<ExportFile> {
        match self.store.export_file() {
            Ok(file) => {
                self.remember(ActionResponse::success(format!(
                    "Exported {} rems to {}.",
                    self.store.database().len(),
                    file.file_name
                )));
                Some(file)
            }
            Err(err) => {
                self.remember(ActionResponse::failure(err.to_string()));
                None
            }
        }
    }

    /// Imports file text, merging by rem id.
    pub fn import_text(&mut self, text: &str) -> ActionResponse {
        let response = match self.store.import_json(text) {
            Ok(report) => ActionResponse::success(format!(
                "Imported {} rems ({} replaced).",
                report.imported, report.replaced
            )),
            Err(err) => ActionResponse::failure(err.to_string()),
        };
        self.remember(response)
    }

    pub fn view(&self) -> WidgetView {
        WidgetView {
            current_rem: self.current_rem.clone(),
            rem: self
                .current_rem
                .as_deref()
                .map(|rem_id| self.store.rem_summary(rem_id)),
            overall: self.store.overall_summary(),
            tracked_rems: self.store.database().len(),
            persistence: self.store.last_persist_status().to_string(),
            last_message: self.last_message.clone(),
        }
    }

    fn record(&mut self, correct: bool) -> ActionResponse {
        let Some(rem_id) = self.current_rem.clone() else {
            return self.remember(ActionResponse::failure(MISSING_REM_MESSAGE));
        };
        let response = match self.store.record_attempt(&rem_id, correct) {
            Ok(summary) => ActionResponse::success(format!(
                "Recorded {} for {rem_id}: {}% over {} attempts.",
                if correct { "correct" } else { "incorrect" },
                summary.accuracy,
                summary.attempts
            )),
            Err(err) => ActionResponse::failure(err.to_string()),
        };
        self.remember(response)
    }

    fn remember(&mut self, response: ActionResponse) -> ActionResponse {
        self.last_message = Some(response.message.clone());
        response
    }
}
