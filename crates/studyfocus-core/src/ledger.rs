//! Writers for the persisted collections.
//!
//! [`Ledger`] is the one place that appends sessions, scores, interruptions
//! and records. It keeps two write-time rules: a zero-second timer run is
//! never stored or scored, and each session has at most one score.
//!
//! Writers append onto the stored rows as raw JSON through
//! [`read_raw_collection`]. Rows this crate cannot model are written back
//! as they were, and a collection that cannot be read at all aborts the
//! write instead of being replaced.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{InterruptionLog, RecordEntry, ScoreEntry, SessionEntry, Task};
use crate::scoring::{calculate_session_points, ScoringInput};
use crate::storage::{load_collection, read_raw_collection, KeyValueStore, StorageKeys};

/// A timer run that just stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTimer {
    pub task_id: String,
    pub seconds: u64,
    #[serde(default)]
    pub pause_count: u32,
    pub started_at: String,
    pub ended_at: String,
}

impl CompletedTimer {
    pub fn scoring_input(&self) -> ScoringInput {
        ScoringInput::new(self.seconds as f64, i64::from(self.pause_count))
    }
}

/// A pause reason picked during a running timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInterruption {
    pub reason_id: String,
    pub duration: u64,
    pub task_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub created_at: String,
}

/// Typed access to the collections of one store.
pub struct Ledger<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    keys: &'a StorageKeys,
}

impl<'a, S: KeyValueStore + ?Sized> Ledger<'a, S> {
    pub fn new(store: &'a mut S, keys: &'a StorageKeys) -> Self {
        Self { store, keys }
    }

    /// Store a finished timer run and its score.
    ///
    /// Returns `Ok(None)` and writes nothing when no time elapsed.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn complete_session(
        &mut self,
        timer: CompletedTimer,
    ) -> Result<Option<(SessionEntry, ScoreEntry)>> {
        let input = timer.scoring_input();
        self.complete_scored(timer, &input)
    }

    /// Store a finished timer run scored with the quality signals of
    /// `record`, then store the record with the awarded points.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn complete_session_with_record(
        &mut self,
        timer: CompletedTimer,
        mut record: RecordEntry,
    ) -> Result<Option<(SessionEntry, ScoreEntry)>> {
        let input = ScoringInput::from_record(
            timer.seconds as f64,
            i64::from(timer.pause_count),
            &record,
        );
        let Some((session, score)) = self.complete_scored(timer, &input)? else {
            return Ok(None);
        };
        record.points = score.points;
        self.save_record(record)?;
        Ok(Some((session, score)))
    }

    fn complete_scored(
        &mut self,
        timer: CompletedTimer,
        input: &ScoringInput,
    ) -> Result<Option<(SessionEntry, ScoreEntry)>> {
        if timer.seconds == 0 {
            tracing::debug!(task_id = %timer.task_id, "zero-length session not recorded");
            return Ok(None);
        }

        let session = SessionEntry {
            id: Uuid::new_v4().to_string(),
            task_id: timer.task_id,
            seconds: timer.seconds,
            pause_count: timer.pause_count,
            started_at: timer.started_at,
            ended_at: timer.ended_at,
        };
        let score = ScoreEntry {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            task_id: session.task_id.clone(),
            points: calculate_session_points(input),
            seconds: Some(session.seconds),
            pause_count: session.pause_count,
            created_at: session.ended_at.clone(),
        };

        let mut sessions = read_raw_collection(&*self.store, &self.keys.sessions)?;
        let mut scores = read_raw_collection(&*self.store, &self.keys.scores)?;
        sessions.push(serde_json::to_value(&session)?);
        upsert_by_session(&mut scores, &score)?;

        self.store.set_many(&[
            (self.keys.sessions.as_str(), serde_json::to_string(&sessions)?),
            (self.keys.scores.as_str(), serde_json::to_string(&scores)?),
        ])?;
        tracing::debug!(session_id = %session.id, points = score.points, "session recorded");
        Ok(Some((session, score)))
    }

    /// Replace the score for `score.session_id` in place, or append it.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn upsert_score(&mut self, score: ScoreEntry) -> Result<()> {
        let keys = self.keys;
        let mut scores = read_raw_collection(&*self.store, &keys.scores)?;
        upsert_by_session(&mut scores, &score)?;
        self.write(&keys.scores, &scores)
    }

    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn log_interruption(&mut self, pause: NewInterruption) -> Result<InterruptionLog> {
        let log = InterruptionLog {
            id: Uuid::new_v4().to_string(),
            reason_id: pause.reason_id,
            duration: pause.duration,
            created_at: pause.created_at,
            task_id: pause.task_id,
            session_id: pause.session_id,
            extra: Default::default(),
        };
        let keys = self.keys;
        self.append(&keys.interruptions, &log)?;
        Ok(log)
    }

    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn save_record(&mut self, record: RecordEntry) -> Result<()> {
        let keys = self.keys;
        self.append(&keys.records, &record)
    }

    pub fn sessions(&self) -> Vec<SessionEntry> {
        load_collection(&*self.store, &self.keys.sessions)
    }

    pub fn scores(&self) -> Vec<ScoreEntry> {
        load_collection(&*self.store, &self.keys.scores)
    }

    pub fn interruptions(&self) -> Vec<InterruptionLog> {
        load_collection(&*self.store, &self.keys.interruptions)
    }

    pub fn records(&self) -> Vec<RecordEntry> {
        load_collection(&*self.store, &self.keys.records)
    }

    pub fn tasks(&self) -> Vec<Task> {
        load_collection(&*self.store, &self.keys.tasks)
    }

    fn append<T: Serialize>(&mut self, key: &str, item: &T) -> Result<()> {
        let mut rows = read_raw_collection(&*self.store, key)?;
        rows.push(serde_json::to_value(item)?);
        self.write(key, &rows)
    }

    fn write(&mut self, key: &str, rows: &[Value]) -> Result<()> {
        let raw = serde_json::to_string(rows)?;
        self.store.set(key, &raw)
    }
}

/// Replace the row with the same `sessionId` in place, or append.
fn upsert_by_session(rows: &mut Vec<Value>, score: &ScoreEntry) -> Result<()> {
    let value = serde_json::to_value(score)?;
    let existing = rows
        .iter_mut()
        .find(|row| row.get("sessionId").and_then(Value::as_str) == Some(score.session_id.as_str()));
    match existing {
        Some(row) => *row = value,
        None => rows.push(value),
    }
    Ok(())
}
