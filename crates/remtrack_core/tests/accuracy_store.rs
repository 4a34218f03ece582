use remtrack_core::{
    compute_accuracy, AccuracyStore, Attempt, Database, LocalBackend, ParseError, PersistStatus,
    RemRecord, StorageAdapter, TrackerError,
};
use std::sync::Arc;

const KEY: &str = "remnote-accuracy-tracker:v1";

fn store_with_local() -> (AccuracyStore, Arc<LocalBackend>) {
    let local = Arc::new(LocalBackend::in_memory().unwrap());
    let adapter = StorageAdapter::new(KEY).with_backend(local.clone());
    (AccuracyStore::open(adapter), local)
}

fn record(pattern: &[bool]) -> RemRecord {
    RemRecord::from_attempts(
        pattern
            .iter()
            .enumerate()
            .map(|(idx, correct)| Attempt::new(*correct, 1_000 + idx as i64))
            .collect(),
    )
}

fn seeded_store() -> (AccuracyStore, Arc<LocalBackend>) {
    let (mut store, local) = store_with_local();
    store.record_attempt_at("a", true, 1).unwrap();
    store.record_attempt_at("a", true, 2).unwrap();
    store.record_attempt_at("b", false, 3).unwrap();
    (store, local)
}

#[test]
fn compute_accuracy_examples() {
    assert_eq!(compute_accuracy(&[]), 0);
    let mut attempts = vec![Attempt::new(true, 0); 3];
    attempts.push(Attempt::new(false, 0));
    assert_eq!(compute_accuracy(&attempts), 75);
}

#[test]
fn two_attempts_give_fifty_percent_per_rem_and_overall() {
    let (mut store, _local) = store_with_local();

    store.record_attempt("r1", true).unwrap();
    store.record_attempt("r1", false).unwrap();

    let attempts = &store.database().get("r1").unwrap().attempts;
    assert_eq!(compute_accuracy(attempts), 50);
    assert_eq!(store.rem_summary("r1").accuracy, 50);
    assert_eq!(store.overall_summary().accuracy, 50);
    assert!(attempts[0].correct);
    assert!(!attempts[1].correct);
}

#[test]
fn empty_rem_id_is_invalid_input_and_changes_nothing() {
    let (mut store, local) = seeded_store();
    let before = store.database().clone();
    let raw_before = local.get_raw(KEY).unwrap();

    let err = store.record_attempt("", true).unwrap_err();
    assert!(matches!(err, TrackerError::InvalidInput(_)));
    let err = store.record_attempt("   ", false).unwrap_err();
    assert!(matches!(err, TrackerError::InvalidInput(_)));

    assert_eq!(store.database(), &before);
    assert_eq!(local.get_raw(KEY).unwrap(), raw_before);
}

#[test]
fn every_mutation_persists_full_database() {
    let (mut store, local) = seeded_store();

    let persisted: Database = serde_json::from_str(&local.get_raw(KEY).unwrap().unwrap()).unwrap();
    assert_eq!(&persisted, store.database());
    assert!(matches!(
        store.last_persist_status(),
        PersistStatus::Volatile { backend_id, fell_back: false } if backend_id == "local"
    ));

    store.reset_rem("a").unwrap();
    let persisted: Database = serde_json::from_str(&local.get_raw(KEY).unwrap().unwrap()).unwrap();
    assert!(!persisted.contains("a"));
    assert!(persisted.contains("b"));
}

#[test]
fn reset_removes_key_entirely() {
    let (mut store, _local) = seeded_store();
    assert!(store.reset_rem("a").unwrap());
    assert!(!store.database().contains("a"));
    assert_eq!(store.rem_summary("a").attempts, 0);
}

#[test]
fn reset_of_missing_rem_is_noop_but_still_persists() {
    let local = Arc::new(LocalBackend::in_memory().unwrap());
    let mut store = AccuracyStore::open(StorageAdapter::new(KEY).with_backend(local.clone()));
    assert_eq!(store.last_persist_status(), &PersistStatus::NotAttempted);

    let removed = store.reset_rem("ghost").unwrap();

    assert!(!removed);
    assert!(store.database().is_empty());
    assert!(matches!(
        store.last_persist_status(),
        PersistStatus::Volatile { backend_id, fell_back: false } if backend_id == "local"
    ));
    assert_eq!(local.get_raw(KEY).unwrap().as_deref(), Some("{}"));
}

#[test]
fn import_of_empty_database_is_noop() {
    let (mut store, _local) = seeded_store();
    let before = store.database().clone();

    let report = store.import_merge(Database::new());

    assert_eq!(report.imported, 0);
    assert_eq!(report.replaced, 0);
    assert_eq!(store.database(), &before);
}

#[test]
fn import_overwrites_one_key_and_keeps_the_rest() {
    let (mut store, _local) = seeded_store();
    let before = store.database().clone();
    let incoming_record = record(&[false, false, true]);
    let incoming: Database = [("a".to_string(), incoming_record.clone())]
        .into_iter()
        .collect();

    let report = store.import_merge(incoming);

    assert_eq!(report.replaced, 1);
    assert_eq!(store.database().get("a"), Some(&incoming_record));
    assert_eq!(store.database().get("b"), before.get("b"));
    assert_eq!(store.database().len(), before.len());
}

#[test]
fn import_adds_new_keys() {
    let (mut store, _local) = seeded_store();
    let incoming: Database = [("c".to_string(), record(&[true]))].into_iter().collect();

    let report = store.import_merge(incoming);

    assert_eq!(report.imported, 1);
    assert_eq!(report.replaced, 0);
    assert_eq!(store.database().len(), 3);
}

#[test]
fn export_then_import_is_idempotent() {
    let (mut store, _local) = seeded_store();
    let before = store.database().clone();

    let exported = store.export_json().unwrap();
    store.import_json(&exported).unwrap();

    assert_eq!(store.database(), &before);
    assert_eq!(store.export_json().unwrap(), exported);
}

#[test]
fn malformed_import_is_parse_error_and_changes_nothing() {
    let (mut store, local) = seeded_store();
    let before = store.database().clone();
    let raw_before = local.get_raw(KEY).unwrap();

    for input in ["", "{", "[1,2]", r#"{"a": {"attempts": "no"}}"#] {
        let err = store.import_json(input).unwrap_err();
        assert!(matches!(err, TrackerError::Parse(_)), "input {input:?}");
    }

    assert_eq!(store.database(), &before);
    assert_eq!(local.get_raw(KEY).unwrap(), raw_before);
}

#[test]
fn load_replaces_in_memory_state_wholesale() {
    let local = Arc::new(LocalBackend::in_memory().unwrap());
    let mut seed = Database::new();
    seed.insert_record("stored".to_string(), record(&[true]));
    local.set_raw(KEY, &serde_json::to_string(&seed).unwrap()).unwrap();

    let mut store = AccuracyStore::new(StorageAdapter::new(KEY).with_backend(local.clone()));
    assert!(store.database().is_empty());

    store.load();

    assert!(store.is_loaded());
    assert_eq!(store.database(), &seed);
}

#[test]
fn store_survives_reopen_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");

    {
        let adapter =
            StorageAdapter::new(KEY).with_backend(Arc::new(LocalBackend::open(&path).unwrap()));
        let mut store = AccuracyStore::open(adapter);
        store.record_attempt_at("r1", true, 10).unwrap();
    }

    let adapter =
        StorageAdapter::new(KEY).with_backend(Arc::new(LocalBackend::open(&path).unwrap()));
    let store = AccuracyStore::open(adapter);
    assert_eq!(store.rem_summary("r1").correct, 1);
}

#[test]
fn import_with_untrimmed_key_is_rejected_and_changes_nothing() {
    let (mut store, local) = seeded_store();
    let before = store.database().clone();
    let raw_before = local.get_raw(KEY).unwrap();

    let err = store
        .import_json(r#"{" r1 ": {"attempts": [{"correct": true, "ts": 1}]}}"#)
        .unwrap_err();

    assert!(matches!(
        err,
        TrackerError::Parse(ParseError::InvalidRemId(ref key)) if key == " r1 "
    ));
    assert_eq!(store.database(), &before);
    assert_eq!(local.get_raw(KEY).unwrap(), raw_before);
}

#[test]
fn every_stored_key_stays_reachable_through_trimmed_ids() {
    let (mut store, _local) = store_with_local();
    store
        .import_json(r#"{"r1": {"attempts": [{"correct": true, "ts": 1}]}}"#)
        .unwrap();

    assert_eq!(store.rem_summary(" r1 ").attempts, 1);
    store.record_attempt_at(" r1 ", false, 2).unwrap();
    assert_eq!(store.database().len(), 1);
    assert_eq!(store.rem_summary("r1").attempts, 2);

    assert!(store.reset_rem(" r1 ").unwrap());
    assert!(store.database().is_empty());
}

#[test]
fn stored_value_with_untrimmed_key_loads_as_empty() {
    let local = Arc::new(LocalBackend::in_memory().unwrap());
    local
        .set_raw(KEY, r#"{" r1 ":{"attempts":[{"correct":true,"ts":1}]}}"#)
        .unwrap();

    let store = AccuracyStore::open(StorageAdapter::new(KEY).with_backend(local));

    assert!(store.database().is_empty());
}
