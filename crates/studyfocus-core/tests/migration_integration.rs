//! Interruption backfill against real stores.
//!
//! Runs the migrator on an on-disk SQLite store, reopens the file, and checks
//! that the backfill and the flag both persisted and that later runs are no-ops.

use serde_json::{json, Value};
use studyfocus_core::storage::{load_raw_collection, KeyValueStore};
use studyfocus_core::{
    migrate_interruptions, InterruptionLog, InterruptionMigrator, MemoryStore, MigrationOutcome,
    MigrationState, SqliteStore, StorageKeys,
};

fn seed<S: KeyValueStore>(store: &mut S) {
    let sessions = json!([
        {"id": "s1", "taskId": "t1", "seconds": 1500, "pauseCount": 1,
         "startedAt": "2026-02-17T09:00:00Z", "endedAt": "2026-02-17T09:25:00Z"},
        {"id": "s2", "taskId": "t2", "seconds": 900, "pauseCount": 0,
         "startedAt": "2026-02-17T10:00:00Z", "endedAt": "2026-02-17T10:15:00Z"}
    ]);
    let interruptions = json!([
        {"id": "i1", "reasonId": "phone", "duration": 30,
         "createdAt": "2026-02-17T09:10:00Z", "taskId": "t1", "device": "android"},
        {"id": "i2", "reasonId": "door", "duration": 10,
         "createdAt": "2026-02-17T10:05:00Z", "taskId": "t1"},
        {"id": "i3", "reasonId": "chat", "duration": 5,
         "createdAt": "2026-02-17T10:05:00Z", "taskId": "t2", "sessionId": ""}
    ]);
    store.set("sessions", &sessions.to_string()).unwrap();
    store.set("interruptions", &interruptions.to_string()).unwrap();
}

#[test]
fn backfill_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studyfocus.db");
    let keys = StorageKeys::default();

    {
        let mut store = SqliteStore::open(&path).unwrap();
        seed(&mut store);
        let outcome = migrate_interruptions(&mut store, &keys);
        assert_eq!(
            outcome,
            MigrationOutcome::Backfilled {
                scanned: 3,
                updated: 1
            }
        );
    }

    let mut store = SqliteStore::open(&path).unwrap();
    let migrator = InterruptionMigrator::new(&keys);
    assert_eq!(migrator.state(&store), MigrationState::Completed);

    let raw = load_raw_collection(&store, "interruptions");
    assert_eq!(raw[0]["sessionId"], "s1");
    assert_eq!(raw[0]["device"], "android");
    // Wrong task: no match, still absent.
    assert!(raw[1].get("sessionId").is_none());
    // Present-but-empty is left alone.
    assert_eq!(raw[2]["sessionId"], "");

    assert_eq!(migrator.run(&mut store), MigrationOutcome::AlreadyCompleted);
}

#[test]
fn second_run_changes_nothing() {
    let keys = StorageKeys::default();
    let mut store = MemoryStore::new();
    seed(&mut store);

    migrate_interruptions(&mut store, &keys);
    let after_first = store.get("interruptions").unwrap();

    // New legacy rows written after the flag is set are not touched.
    let mut rows: Vec<Value> = serde_json::from_str(after_first.as_deref().unwrap()).unwrap();
    rows.push(json!({"id": "i4", "reasonId": "phone", "duration": 3,
                     "createdAt": "2026-02-17T09:20:00Z", "taskId": "t1"}));
    store
        .set("interruptions", &Value::Array(rows).to_string())
        .unwrap();
    let before_second = store.get("interruptions").unwrap();

    assert_eq!(
        migrate_interruptions(&mut store, &keys),
        MigrationOutcome::AlreadyCompleted
    );
    assert_eq!(store.get("interruptions").unwrap(), before_second);
}

#[test]
fn malformed_collection_fails_once_and_sets_flag() {
    let keys = StorageKeys::default();
    let mut store = MemoryStore::new();
    store.set("interruptions", "[{\"id\":").unwrap();

    let outcome = migrate_interruptions(&mut store, &keys);
    assert!(matches!(outcome, MigrationOutcome::Failed { .. }));
    assert_eq!(store.get("interruptions").unwrap().as_deref(), Some("[{\"id\":"));
    assert_eq!(
        InterruptionMigrator::new(&keys).state(&store),
        MigrationState::Completed
    );
    assert_eq!(
        migrate_interruptions(&mut store, &keys),
        MigrationOutcome::AlreadyCompleted
    );
}

#[test]
fn reset_allows_a_fresh_backfill() {
    let keys = StorageKeys::default();
    let mut store = SqliteStore::open_in_memory().unwrap();
    let migrator = InterruptionMigrator::new(&keys);
    migrator.run(&mut store);

    seed(&mut store);
    migrator.reset(&mut store).unwrap();
    assert_eq!(migrator.state(&store), MigrationState::NotRun);

    let outcome = migrator.run(&mut store);
    assert_eq!(
        outcome,
        MigrationOutcome::Backfilled {
            scanned: 3,
            updated: 1
        }
    );
    let logs: Vec<InterruptionLog> =
        serde_json::from_str(&store.get("interruptions").unwrap().unwrap()).unwrap();
    assert_eq!(logs[0].session_id.as_deref(), Some("s1"));
}

#[test]
fn custom_keys_are_honored() {
    let keys: StorageKeys = serde_json::from_value(json!({
        "sessions": "sf.sessions",
        "interruptions": "sf.interruptions",
        "interruptionsMigrated": "sf.migrated"
    }))
    .unwrap();
    let mut store = MemoryStore::with_entries([
        (
            "sf.sessions",
            r#"[{"id":"s9","taskId":"t1","seconds":60,"startedAt":"2026-02-17T09:00:00Z","endedAt":"2026-02-17T09:01:00Z"}]"#,
        ),
        (
            "sf.interruptions",
            r#"[{"id":"i1","reasonId":"x","duration":1,"createdAt":"2026-02-17T09:00:30Z","taskId":"t1"}]"#,
        ),
    ]);

    migrate_interruptions(&mut store, &keys);

    assert!(store.get("sf.migrated").unwrap().is_some());
    assert!(store.get("interruptionsMigrated").unwrap().is_none());
    assert!(store
        .get("sf.interruptions")
        .unwrap()
        .unwrap()
        .contains("\"sessionId\":\"s9\""));
}
