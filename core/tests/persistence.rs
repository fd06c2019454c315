//! Version store, active-version history, config loading and
//! reproducibility under a pinned clock.

use certlens_core::{
    clock::IngestClock,
    config::IngestConfig,
    dataset::{DatasetHistory, DatasetVersion},
    error::IngestError,
    event::IngestEvent,
    fixture::{generate_csv, FixtureSpec},
    ingest::Ingestor,
    record::DeveloperRecord,
    store::VersionStore,
};
use chrono::{DateTime, TimeZone, Utc};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn clock(day: u32) -> IngestClock {
    IngestClock::fixed(Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap())
}

fn store() -> VersionStore {
    let store = VersionStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn fixture(rows: usize, seed: u64) -> String {
    generate_csv(&FixtureSpec { rows, seed, ..FixtureSpec::default() }).0
}

fn stamp(day: u32) -> DateTime<Utc> {
    clock(day).now()
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[test]
fn version_round_trips_through_the_store() {
    let store = store();
    let ingestor = Ingestor::new(IngestConfig::default_test(), clock(1));
    let version = ingestor.ingest("june.csv", &fixture(250, 5)).expect("ingest");

    store.insert_version(&version).expect("insert");
    let loaded = store.load_version(&version.id).expect("load").expect("present");
    assert_eq!(loaded, version);
}

#[test]
fn unknown_version_loads_as_none() {
    assert!(store().load_version("missing").expect("query").is_none());
}

#[test]
fn versions_list_newest_first() {
    let store = store();
    for (day, name) in [(1, "first.csv"), (3, "third.csv"), (2, "second.csv")] {
        let version = Ingestor::new(IngestConfig::default_test(), clock(day))
            .ingest(name, &fixture(20, day as u64))
            .expect("ingest");
        store.insert_version(&version).expect("insert");
    }

    let list = store.list_versions().expect("list");
    let names: Vec<&str> = list.iter().map(|v| v.file_name.as_str()).collect();
    assert_eq!(names, vec!["third.csv", "second.csv", "first.csv"]);
    assert_eq!(list[0].upload_date, stamp(3));
    assert_eq!(list[0].record_count, 20);
}

#[test]
fn events_are_logged_per_version_and_deleted_with_it() {
    let store = store();
    let ingestor = Ingestor::new(IngestConfig::default_test(), clock(1));
    let mut events = Vec::new();
    let version = ingestor
        .ingest_with("june.csv", &fixture(250, 9), |e| events.push(e.clone()))
        .expect("ingest");

    store.insert_version(&version).expect("insert");
    for e in &events {
        store.append_event(&version.id, e).expect("append");
    }

    let logged = store.events_for_version(&version.id).expect("events");
    assert_eq!(logged.len(), events.len());
    assert_eq!(logged[0].event_type, "ingestion_started");
    assert_eq!(logged.last().map(|e| e.event_type.as_str()), Some("ingestion_completed"));

    let decoded: IngestEvent = serde_json::from_str(&logged[1].payload).expect("payload json");
    assert_eq!(decoded, events[1]);

    assert!(store.delete_version(&version.id).expect("delete"));
    assert_eq!(store.event_count(&version.id).expect("count"), 0);
    assert!(store.load_version(&version.id).expect("load").is_none());
    assert!(!store.delete_version(&version.id).expect("second delete"), "already gone");
}

// ── History ───────────────────────────────────────────────────────────────────

#[test]
fn newest_upload_becomes_active_and_selection_switches() {
    let ingestor = Ingestor::new(IngestConfig::default_test(), clock(1));
    let mut history = DatasetHistory::new();
    let a = history.push(ingestor.ingest("a.csv", &fixture(10, 1)).expect("a"));
    let b = history.push(ingestor.ingest("b.csv", &fixture(10, 2)).expect("b"));

    assert_eq!(history.len(), 2);
    assert_eq!(history.active_id(), Some(b.id.as_str()));

    history.select(&a.id).expect("select a");
    assert_eq!(history.active().map(|v| v.file_name.clone()), Some("a.csv".to_string()));

    assert!(matches!(
        history.select("nope"),
        Err(IngestError::VersionNotFound { .. })
    ));
}

#[test]
fn removing_active_version_falls_back_to_newest() {
    let ingestor = Ingestor::new(IngestConfig::default_test(), clock(1));
    let mut history = DatasetHistory::new();
    let a = history.push(ingestor.ingest("a.csv", &fixture(10, 1)).expect("a"));
    let b = history.push(ingestor.ingest("b.csv", &fixture(10, 2)).expect("b"));
    let c = history.push(ingestor.ingest("c.csv", &fixture(10, 3)).expect("c"));

    history.select(&b.id).expect("select b");
    history.remove(&b.id).expect("remove b");
    assert_eq!(history.active_id(), Some(c.id.as_str()));

    history.remove(&c.id).expect("remove c");
    history.remove(&a.id).expect("remove a");
    assert!(history.is_empty());
    assert!(history.active().is_none());

    // Handles taken earlier stay readable.
    assert_eq!(b.record_count, b.records().len());
}

// ── Config ────────────────────────────────────────────────────────────────────

#[test]
fn shipped_config_matches_defaults() {
    let loaded = IngestConfig::load("../data/ingest_config.json").expect("load shipped config");
    assert_eq!(loaded, IngestConfig::default());
}

#[test]
fn partial_config_fills_missing_sections() {
    let path = std::env::temp_dir().join(format!("certlens-partial-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "fraud": { "speed_run_hours": 2.5 } }"#).expect("write config");
    let loaded = IngestConfig::load(path.to_str().expect("utf-8 path")).expect("load");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.fraud.speed_run_hours, 2.5);
    assert_eq!(loaded.fraud.min_wallet_len, 11);
    assert_eq!(loaded.parser.batch_size, 5000);
}

#[test]
fn zero_batch_size_is_rejected() {
    let path = std::env::temp_dir().join(format!("certlens-zero-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "parser": { "batch_size": 0 } }"#).expect("write config");
    let result = IngestConfig::load(path.to_str().expect("utf-8 path"));
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
}

#[test]
fn missing_config_file_names_the_path() {
    let err = IngestConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("Cannot read /definitely/not/here.json"));
}

// ── Reproducibility ───────────────────────────────────────────────────────────

#[test]
fn different_upload_times_change_only_the_ids() {
    let text = fixture(300, 17);
    let a = Ingestor::new(IngestConfig::default_test(), clock(4)).ingest("x.csv", &text).expect("a");
    let b = Ingestor::new(IngestConfig::default_test(), clock(5)).ingest("x.csv", &text).expect("b");

    assert_eq!(a.record_count, b.record_count);
    assert!(
        a.data.iter().zip(&b.data).all(|(x, y)| x.id != y.id),
        "ids from separate uploads never collide"
    );

    let without_ids = |v: &DatasetVersion| -> Vec<DeveloperRecord> {
        v.data.iter().map(|r| DeveloperRecord { id: String::new(), ..r.clone() }).collect()
    };
    assert_eq!(without_ids(&a), without_ids(&b));
}

#[test]
fn same_input_same_clock_same_records() {
    let text = fixture(600, 21);
    let a = Ingestor::new(IngestConfig::default_test(), clock(4)).ingest("x.csv", &text).expect("a");
    let b = Ingestor::new(IngestConfig::default_test(), clock(4)).ingest("x.csv", &text).expect("b");

    assert_eq!(a.data, b.data, "records are a pure function of text, config and clock");
    assert_ne!(a.id, b.id, "every ingestion is a new version");
}
