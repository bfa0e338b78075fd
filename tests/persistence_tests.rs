use chrono::NaiveDate;
use cronograma::calendar::Holiday;
use cronograma::persistence::{
    CsvFileStore, JsonFileStore, PersistenceError, ScheduleSnapshot, SnapshotStore,
    load_snapshot_from_json, save_snapshot_to_json, validate_snapshot,
};
use cronograma::row::RowId;
use cronograma::state::ScheduleState;
use cronograma::task::{Task, TaskCategory, TaskStatus};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn sample_snapshot() -> ScheduleSnapshot {
    let mut base = ScheduleState::with_default_rows().to_snapshot();
    let mut assay = Task::new(
        1,
        "Ensaio 42",
        TaskCategory::EfficiencyAssay,
        RowId::Index(1),
        d(2025, 3, 10),
        d(2025, 3, 14),
    );
    assay.protocol = Some("PT-2025-042".to_string());
    assay.manufacturer = Some("Acme Instrumentos".to_string());
    let mut report = Task::new(
        2,
        "Relatorio 42",
        TaskCategory::EfficiencyAssay,
        RowId::Index(2),
        d(2025, 3, 14),
        d(2025, 3, 17),
    );
    report.depends_on = vec![1];
    report.status = TaskStatus::InProgress;
    base.tasks = vec![assay, report];
    base.holidays = vec![Holiday {
        id: 1,
        name: "Parada anual".to_string(),
        start_date: d(2025, 7, 14),
        end_date: d(2025, 7, 18),
    }];
    base
}

#[test]
fn json_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("schedule.json"));

    assert!(store.load_snapshot().unwrap().is_none());
    let snapshot = sample_snapshot();
    store.save_snapshot(&snapshot).unwrap();

    let loaded = store.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded, snapshot);
}

#[test]
fn csv_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFileStore::new(dir.path().join("schedule.csv"));

    let snapshot = sample_snapshot();
    store.save_snapshot(&snapshot).unwrap();

    let loaded = store.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded, snapshot);
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_round_trip() {
    use cronograma::persistence::SqliteSnapshotStore;

    let store = SqliteSnapshotStore::in_memory().unwrap();
    assert!(store.load_snapshot().unwrap().is_none());

    let snapshot = sample_snapshot();
    store.save_snapshot(&snapshot).unwrap();
    let loaded = store.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded, snapshot);

    // A second save replaces, not appends.
    store.save_snapshot(&snapshot).unwrap();
    let loaded = store.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded.tasks.len(), 2);
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_persists_across_connections() {
    use cronograma::persistence::SqliteSnapshotStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.db");
    {
        let store = SqliteSnapshotStore::new(&path).unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();
    }
    let store = SqliteSnapshotStore::new(&path).unwrap();
    let loaded = store.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded, sample_snapshot());
}

#[test]
fn snapshots_with_dangling_rows_are_refused() {
    let mut snapshot = sample_snapshot();
    snapshot.rows.retain(|row| row.id != RowId::Index(1));

    let err = validate_snapshot(&snapshot).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
    assert!(err.to_string().contains("missing row"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let err = save_snapshot_to_json(&snapshot, &path).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
    assert!(!path.exists(), "refused snapshots must not touch disk");
}

#[test]
fn snapshots_with_cycles_are_refused() {
    let mut snapshot = sample_snapshot();
    snapshot.tasks[0].depends_on = vec![2];

    let err = validate_snapshot(&snapshot).unwrap_err();
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn corrupt_json_on_disk_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.json");
    std::fs::write(&path, "{\"tasks\": [{\"id\": \"not-a-number\"}]}").unwrap();

    assert!(load_snapshot_from_json(&path).is_err());
}

#[test]
fn hosting_rules_are_validated_on_load() {
    let mut snapshot = sample_snapshot();
    // The built-in safety row "A" cannot host an efficiency assay.
    snapshot.tasks[0].row_id = RowId::Letter("A".to_string());

    let err = validate_snapshot(&snapshot).unwrap_err();
    assert!(err.to_string().contains("cannot sit on"));
}
