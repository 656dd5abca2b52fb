//! Ledger writes feeding the aggregator, end to end.

use chrono::{DateTime, FixedOffset, Utc};
use studyfocus_core::storage::KeyValueStore;
use studyfocus_core::{
    CompletedTimer, Ledger, MemoryStore, NewInterruption, ScoreEntry, SqliteStore, StorageKeys,
    TemporalAggregator, DEFAULT_TREND_DAYS,
};

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn timer(seconds: u64, started_at: &str, ended_at: &str) -> CompletedTimer {
    CompletedTimer {
        task_id: "t1".into(),
        seconds,
        pause_count: 0,
        started_at: started_at.into(),
        ended_at: ended_at.into(),
    }
}

#[test]
fn recorded_sessions_roll_up_by_day() {
    let dir = tempfile::tempdir().unwrap();
    let keys = StorageKeys::default();
    let mut store = SqliteStore::open(dir.path().join("stats.db")).unwrap();
    let mut ledger = Ledger::new(&mut store, &keys);

    ledger
        .complete_session(timer(1500, "2026-02-16T09:00:00Z", "2026-02-16T09:25:00Z"))
        .unwrap();
    ledger
        .complete_session(timer(600, "2026-02-17T09:00:00Z", "2026-02-17T09:10:00Z"))
        .unwrap();
    ledger
        .complete_session(timer(300, "2026-02-17T10:00:00Z", "2026-02-17T10:05:00Z"))
        .unwrap();
    assert!(ledger
        .complete_session(timer(0, "2026-02-17T11:00:00Z", "2026-02-17T11:00:00Z"))
        .unwrap()
        .is_none());

    let aggregator = TemporalAggregator::with_timezone(Utc);
    let summaries = aggregator.create_daily_summaries(&ledger.sessions(), &ledger.scores());

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].date, "2026-02-17");
    assert_eq!(summaries[0].total_seconds, 900);
    assert_eq!(summaries[0].session_count, 2);
    assert_eq!(summaries[0].score_count, 2);
    // 10 min -> 60 pts, 5 min -> 30 pts
    assert_eq!(summaries[0].total_points, 90);
    assert_eq!(summaries[1].date, "2026-02-16");
    assert_eq!(summaries[1].total_points, 150);

    let trend = aggregator.build_weekly_trend(
        &summaries,
        DEFAULT_TREND_DAYS,
        utc("2026-02-18T12:00:00Z"),
    );
    let minutes: Vec<u64> = trend.iter().map(|p| p.minutes).collect();
    assert_eq!(minutes, vec![0, 0, 0, 0, 25, 15, 0]);
    assert_eq!(trend[0].date, "2026-02-12");
    assert_eq!(trend[6].date, "2026-02-18");

    let day = aggregator.get_stats_for_date_range(
        &ledger.sessions(),
        &ledger.scores(),
        utc("2026-02-17T00:00:00Z"),
        utc("2026-02-17T00:00:00Z"),
    );
    assert_eq!(day.session_count, 2);
    assert_eq!(day.total_minutes, 15);
    assert_eq!(day.total_points, 90);
}

#[test]
fn imported_score_without_session_counts_its_seconds() {
    let keys = StorageKeys::default();
    let mut store = MemoryStore::new();
    let mut ledger = Ledger::new(&mut store, &keys);
    ledger
        .upsert_score(ScoreEntry {
            id: "imported".into(),
            session_id: "gone".into(),
            task_id: "t1".into(),
            points: 40,
            seconds: Some(480),
            pause_count: 0,
            created_at: "2026-02-15T20:00:00Z".into(),
        })
        .unwrap();

    let summaries = TemporalAggregator::with_timezone(Utc)
        .create_daily_summaries(&ledger.sessions(), &ledger.scores());

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_seconds, 480);
    assert_eq!(summaries[0].session_count, 0);
    assert_eq!(summaries[0].total_points, 40);
}

#[test]
fn calendar_day_follows_the_aggregator_zone() {
    let keys = StorageKeys::default();
    let mut store = MemoryStore::new();
    let mut ledger = Ledger::new(&mut store, &keys);
    ledger
        .complete_session(timer(1200, "2026-02-16T22:30:00Z", "2026-02-16T22:50:00Z"))
        .unwrap();

    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let in_tokyo = TemporalAggregator::with_timezone(tokyo)
        .create_daily_summaries(&ledger.sessions(), &ledger.scores());
    let in_utc = TemporalAggregator::with_timezone(Utc)
        .create_daily_summaries(&ledger.sessions(), &ledger.scores());

    assert_eq!(in_tokyo[0].date, "2026-02-17");
    assert_eq!(in_utc[0].date, "2026-02-16");
}

#[test]
fn interruptions_logged_with_session_need_no_backfill() {
    let keys = StorageKeys::default();
    let mut store = MemoryStore::new();
    let mut ledger = Ledger::new(&mut store, &keys);
    let (session, _) = ledger
        .complete_session(timer(600, "2026-02-17T09:00:00Z", "2026-02-17T09:10:00Z"))
        .unwrap()
        .unwrap();

    ledger
        .log_interruption(NewInterruption {
            reason_id: "phone".into(),
            duration: 20,
            task_id: "t1".into(),
            session_id: Some(session.id.clone()),
            created_at: "2026-02-17T09:05:00Z".into(),
        })
        .unwrap();

    let logs = ledger.interruptions();
    assert!(logs.iter().all(|l| !l.needs_session_backfill()));
    assert_eq!(logs[0].session_id.as_deref(), Some(session.id.as_str()));
}

#[test]
fn one_bad_session_row_does_not_hide_the_rest() {
    let keys = StorageKeys::default();
    let mut store = MemoryStore::new();
    {
        let mut ledger = Ledger::new(&mut store, &keys);
        ledger
            .complete_session(timer(600, "2026-02-17T09:00:00Z", "2026-02-17T09:10:00Z"))
            .unwrap();
    }
    let raw = store.get("sessions").unwrap().unwrap();
    let patched = raw.replacen(
        '[',
        r#"[{"id":"legacy","taskId":"t1","seconds":90.5,"startedAt":"x","endedAt":"y"},"#,
        1,
    );
    store.set("sessions", &patched).unwrap();

    let ledger = Ledger::new(&mut store, &keys);
    let summaries =
        TemporalAggregator::with_timezone(Utc).create_daily_summaries(&ledger.sessions(), &[]);

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_seconds, 600);
}
