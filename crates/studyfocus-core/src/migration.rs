//! One-time backfill of `sessionId` on legacy interruption records.
//!
//! Early builds logged pauses without the session they happened in. On the
//! first start of a newer build each such record is linked to the first
//! session of the same task whose `[startedAt, endedAt]` window contains the
//! record's `createdAt`.
//!
//! A boolean flag key guards the run. It moves `NotRun -> Completed` exactly
//! once, and it moves there even when the backfill fails, so poisoned data
//! can never cause a retry loop on every start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::{InterruptionLog, SessionEntry};
use crate::storage::{read_raw_collection, KeyValueStore, StorageKeys};
use crate::time::parse_instant;

/// Persisted state of the migration flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationState {
    NotRun,
    Completed,
}

impl MigrationState {
    /// Read the flag stored under `key`. Anything but JSON `true` is `NotRun`.
    pub fn read<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Self {
        match store.get(key) {
            Ok(Some(raw)) if serde_json::from_str::<bool>(&raw).unwrap_or(false) => {
                Self::Completed
            }
            Ok(_) => Self::NotRun,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read migration flag");
                Self::NotRun
            }
        }
    }

    /// Raw value persisted for this state.
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::NotRun => "false",
            Self::Completed => "true",
        }
    }

    /// Write this state under `key`.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub fn write<S: KeyValueStore + ?Sized>(self, store: &mut S, key: &str) -> Result<()> {
        store.set(key, self.as_flag())
    }
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum MigrationOutcome {
    /// The flag was already set; nothing was read or written.
    AlreadyCompleted,
    /// The backfill ran. The collection was rewritten only if `updated > 0`.
    Backfilled { scanned: usize, updated: usize },
    /// The backfill failed and was abandoned. The flag is still set.
    Failed { reason: String },
}

/// Matches legacy interruptions to the sessions they occurred in.
#[derive(Debug, Clone)]
pub struct InterruptionMigrator {
    interruptions_key: String,
    sessions_key: String,
    flag_key: String,
}

impl Default for InterruptionMigrator {
    fn default() -> Self {
        Self::new(&StorageKeys::default())
    }
}

impl InterruptionMigrator {
    pub fn new(keys: &StorageKeys) -> Self {
        Self {
            interruptions_key: keys.interruptions.clone(),
            sessions_key: keys.sessions.clone(),
            flag_key: keys.interruptions_migrated.clone(),
        }
    }

    pub fn state<S: KeyValueStore + ?Sized>(&self, store: &S) -> MigrationState {
        MigrationState::read(store, &self.flag_key)
    }

    /// Clear the flag so the next [`run`](Self::run) backfills again.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub fn reset<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.remove(&self.flag_key)
    }

    /// Run the migration unless the flag says it already ran.
    ///
    /// Never fails: errors are logged and reported as [`MigrationOutcome::Failed`].
    pub fn run<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> MigrationOutcome {
        if self.state(store) == MigrationState::Completed {
            tracing::debug!(key = %self.flag_key, "interruption migration already completed");
            return MigrationOutcome::AlreadyCompleted;
        }

        let outcome = match self.backfill(store) {
            Ok((interruptions, updated)) if updated > 0 => {
                let scanned = interruptions.len();
                match self.persist(store, &interruptions) {
                    Ok(()) => MigrationOutcome::Backfilled { scanned, updated },
                    Err(e) => MigrationOutcome::Failed {
                        reason: e.to_string(),
                    },
                }
            }
            Ok((interruptions, _)) => {
                self.mark_completed(store);
                MigrationOutcome::Backfilled {
                    scanned: interruptions.len(),
                    updated: 0,
                }
            }
            Err(e) => MigrationOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            MigrationOutcome::Backfilled { scanned, updated } => {
                tracing::info!(scanned, updated, "interruption migration finished");
            }
            MigrationOutcome::Failed { reason } => {
                tracing::error!(%reason, "interruption migration failed; marking as done");
                self.mark_completed(store);
            }
            MigrationOutcome::AlreadyCompleted => {}
        }
        outcome
    }

    /// Load both collections and fill missing session ids in memory.
    ///
    /// Rows are matched as raw JSON, so a row with an odd field type is
    /// skipped rather than failing the run, and every row is written back
    /// with its fields intact.
    fn backfill<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<(Vec<Value>, usize)> {
        let mut interruptions = read_raw_collection(store, &self.interruptions_key)?;
        let sessions = read_raw_collection(store, &self.sessions_key)?;
        let updated = link_raw_interruptions(&mut interruptions, &sessions);
        Ok((interruptions, updated))
    }

    /// Write the collection and the flag together.
    fn persist<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        interruptions: &[Value],
    ) -> Result<()> {
        let raw = serde_json::to_string(interruptions)?;
        store.set_many(&[
            (self.interruptions_key.as_str(), raw),
            (
                self.flag_key.as_str(),
                MigrationState::Completed.as_flag().to_string(),
            ),
        ])
    }

    fn mark_completed<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        if let Err(e) = MigrationState::Completed.write(store, &self.flag_key) {
            tracing::error!(key = %self.flag_key, error = %e, "failed to set migration flag");
        }
    }
}

/// Migrate with the given key layout. Intended to run once per startup.
pub fn migrate_interruptions<S: KeyValueStore + ?Sized>(
    store: &mut S,
    keys: &StorageKeys,
) -> MigrationOutcome {
    InterruptionMigrator::new(keys).run(store)
}

/// Time window of one session, as the matcher sees it.
struct SessionWindow<'a> {
    id: &'a str,
    task_id: &'a str,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl<'a> SessionWindow<'a> {
    fn new(id: &'a str, task_id: &'a str, started_at: &str, ended_at: &str) -> Self {
        Self {
            id,
            task_id,
            window: parse_instant(started_at).zip(parse_instant(ended_at)),
        }
    }

    fn from_row(row: &'a Value) -> Option<Self> {
        Some(Self::new(
            row.get("id")?.as_str()?,
            row.get("taskId")?.as_str()?,
            row.get("startedAt")?.as_str()?,
            row.get("endedAt")?.as_str()?,
        ))
    }
}

/// First session of `task_id` whose window contains `created_at`.
fn find_session<'a>(
    windows: &[SessionWindow<'a>],
    task_id: &str,
    created_at: &str,
) -> Option<&'a str> {
    let at = parse_instant(created_at)?;
    windows
        .iter()
        .find(|w| {
            w.task_id == task_id && w.window.is_some_and(|(start, end)| start <= at && at <= end)
        })
        .map(|w| w.id)
}

/// Assign `session_id` to every interruption lacking one whose `created_at`
/// falls inside a session of the same task. Returns the number linked.
///
/// Sessions are tried in slice order and the first match wins. Records with
/// an unparseable timestamp never match.
pub fn link_interruptions(
    interruptions: &mut [InterruptionLog],
    sessions: &[SessionEntry],
) -> usize {
    let windows: Vec<SessionWindow> = sessions
        .iter()
        .map(|s| SessionWindow::new(&s.id, &s.task_id, &s.started_at, &s.ended_at))
        .collect();

    let mut updated = 0;
    for log in interruptions.iter_mut().filter(|l| l.needs_session_backfill()) {
        if let Some(id) = find_session(&windows, &log.task_id, &log.created_at) {
            log.session_id = Some(id.to_string());
            updated += 1;
        }
    }
    updated
}

/// [`link_interruptions`] over stored JSON rows.
///
/// A row is a candidate when it is an object whose `sessionId` is absent or
/// `null` and whose `taskId` and `createdAt` are strings. Session rows
/// without string `id`, `taskId`, `startedAt` and `endedAt` are ignored.
/// Only `sessionId` is ever written.
pub fn link_raw_interruptions(interruptions: &mut [Value], sessions: &[Value]) -> usize {
    let windows: Vec<SessionWindow> = sessions.iter().filter_map(SessionWindow::from_row).collect();

    let mut updated = 0;
    for row in interruptions.iter_mut() {
        let Value::Object(fields) = row else {
            continue;
        };
        if !fields.get("sessionId").map_or(true, Value::is_null) {
            continue;
        }
        let (Some(task_id), Some(created_at)) = (
            fields.get("taskId").and_then(Value::as_str),
            fields.get("createdAt").and_then(Value::as_str),
        ) else {
            continue;
        };
        if let Some(id) = find_session(&windows, task_id, created_at) {
            let id = id.to_string();
            fields.insert("sessionId".into(), Value::String(id));
            updated += 1;
        }
    }
    updated
}
