//! Key-value persistence seam.
//!
//! The application state is a flat mapping from string keys to JSON blobs
//! (one array per collection plus a few scalar flags). The core never owns
//! the store; hosts hand in anything implementing [`KeyValueStore`].
//!
//! - [`MemoryStore`]: `HashMap`-backed, for tests and embedding hosts
//! - [`SqliteStore`]: a `kv` table in a SQLite file
//!
//! Typed readers are lenient per element: a row that does not fit the
//! record type is skipped, the rest of the collection still loads.
//! [`load_collection`] and [`load_raw_collection`] never fail. A missing
//! key, a store error or malformed JSON all read as an empty array.
//! [`read_collection`] propagates store I/O errors only.
//! [`read_collection_strict`] propagates store and parse errors.
//!
//! Writers go through [`read_raw_collection`], which fails on anything it
//! cannot read back as a JSON array. Rows are kept as `serde_json::Value`,
//! so a write never drops rows or fields it does not model.

mod config;
pub mod database;
pub mod memory;

pub use config::{Config, ExportConfig, StorageConfig, TrendConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result, ValidationError};

/// Backing store for persisted collections.
pub trait KeyValueStore {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Write several keys as one unit where the backend supports it.
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Store keys for each persisted collection and flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "default_tasks_key")]
    pub tasks: String,
    #[serde(default = "default_sessions_key")]
    pub sessions: String,
    #[serde(default = "default_scores_key")]
    pub scores: String,
    #[serde(default = "default_interruptions_key")]
    pub interruptions: String,
    #[serde(default = "default_records_key")]
    pub records: String,
    #[serde(default = "default_rules_key")]
    pub rules: String,
    /// Boolean flag owned by the interruption migrator.
    #[serde(default = "default_migration_flag_key")]
    pub interruptions_migrated: String,
}

fn default_tasks_key() -> String {
    "tasks".into()
}
fn default_sessions_key() -> String {
    "sessions".into()
}
fn default_scores_key() -> String {
    "scores".into()
}
fn default_interruptions_key() -> String {
    "interruptions".into()
}
fn default_records_key() -> String {
    "records".into()
}
fn default_rules_key() -> String {
    "rules".into()
}
fn default_migration_flag_key() -> String {
    "interruptionsMigrated".into()
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            tasks: default_tasks_key(),
            sessions: default_sessions_key(),
            scores: default_scores_key(),
            interruptions: default_interruptions_key(),
            records: default_records_key(),
            rules: default_rules_key(),
            interruptions_migrated: default_migration_flag_key(),
        }
    }
}

/// Returns `~/.config/studyfocus[-dev]/` based on STUDYFOCUS_ENV.
///
/// Set STUDYFOCUS_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYFOCUS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studyfocus-dev")
    } else {
        base_dir.join("studyfocus")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Load a typed collection, treating every failure as an empty array.
pub fn load_collection<T, S>(store: &S, key: &str) -> Vec<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match read_collection(store, key) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read collection; using empty");
            Vec::new()
        }
    }
}

/// Load a typed collection. Store errors propagate.
///
/// Malformed JSON or a non-array value reads as empty. Rows that do not
/// deserialize as `T` are skipped.
///
/// # Errors
/// Returns an error if the store itself fails.
pub fn read_collection<T, S>(store: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    let rows = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(rows)) => rows,
        Ok(_) => {
            tracing::warn!(key, "stored collection is not an array; using empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed collection; using empty");
            return Ok(Vec::new());
        }
    };
    let total = rows.len();
    let items: Vec<T> = rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect();
    if items.len() < total {
        tracing::debug!(key, skipped = total - items.len(), "skipped non-conforming rows");
    }
    Ok(items)
}

/// Load a typed collection, propagating both store and parse errors.
///
/// # Errors
/// Returns an error if the store fails or the stored value is not a valid
/// array of `T`.
pub fn read_collection_strict<T, S>(store: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

/// Load a collection as untyped JSON values so unknown fields survive.
///
/// Anything that is not a JSON array reads as empty.
pub fn load_raw_collection<S>(store: &S, key: &str) -> Vec<Value>
where
    S: KeyValueStore + ?Sized,
{
    match read_raw_collection(store, key) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read collection; using empty");
            Vec::new()
        }
    }
}

/// Load a collection as untyped JSON values. A missing key is empty.
///
/// # Errors
/// Returns an error if the store fails, the value is not valid JSON, or it
/// is not an array.
pub fn read_raw_collection<S>(store: &S, key: &str) -> Result<Vec<Value>>
where
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(&raw)? {
        Value::Array(rows) => Ok(rows),
        _ => Err(ValidationError::InvalidValue {
            field: key.to_string(),
            message: "stored collection is not an array".into(),
        }
        .into()),
    }
}

/// Serialize and write a collection.
///
/// # Errors
/// Returns an error if serialization or the store write fails.
pub fn save_collection<T, S>(store: &mut S, key: &str, items: &[T]) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(items)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionEntry;

    fn session(id: &str) -> SessionEntry {
        SessionEntry {
            id: id.into(),
            task_id: "t1".into(),
            seconds: 1500,
            pause_count: 0,
            started_at: "2026-02-17T09:00:00Z".into(),
            ended_at: "2026-02-17T09:25:00Z".into(),
        }
    }

    #[test]
    fn missing_key_loads_empty() {
        let store = MemoryStore::new();
        let sessions: Vec<SessionEntry> = load_collection(&store, "sessions");
        assert!(sessions.is_empty());
        assert!(load_raw_collection(&store, "sessions").is_empty());
    }

    #[test]
    fn malformed_json_loads_empty() {
        let mut store = MemoryStore::new();
        store.set("sessions", "{not json").unwrap();
        let sessions: Vec<SessionEntry> = load_collection(&store, "sessions");
        assert!(sessions.is_empty());
        assert!(read_collection::<SessionEntry, _>(&store, "sessions")
            .unwrap()
            .is_empty());
        assert!(read_collection_strict::<SessionEntry, _>(&store, "sessions").is_err());
    }

    #[test]
    fn rows_of_the_wrong_shape_are_skipped() {
        let mut store = MemoryStore::new();
        store
            .set(
                "sessions",
                r#"[
                    {"id":"s1","taskId":"t1","seconds":90.5,"startedAt":"a","endedAt":"b"},
                    {"id":"s2","taskId":"t1","seconds":60,"startedAt":"a","endedAt":"b"}
                ]"#,
            )
            .unwrap();
        let sessions: Vec<SessionEntry> = load_collection(&store, "sessions");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "s2");
        assert!(read_collection_strict::<SessionEntry, _>(&store, "sessions").is_err());
    }

    #[test]
    fn raw_reads_fail_on_unreadable_values() {
        let mut store = MemoryStore::new();
        assert!(read_raw_collection(&store, "scores").unwrap().is_empty());
        store.set("scores", "[{broken").unwrap();
        assert!(read_raw_collection(&store, "scores").is_err());
        store.set("scores", r#"{"a":1}"#).unwrap();
        assert!(read_raw_collection(&store, "scores").is_err());
        store.set("scores", r#"[{"id":"x","odd":true}]"#).unwrap();
        assert_eq!(read_raw_collection(&store, "scores").unwrap()[0]["odd"], true);
    }

    #[test]
    fn non_array_raw_collection_loads_empty() {
        let mut store = MemoryStore::new();
        store.set("rules", r#"{"a":1}"#).unwrap();
        assert!(load_raw_collection(&store, "rules").is_empty());
    }

    #[test]
    fn save_then_load() {
        let mut store = MemoryStore::new();
        save_collection(&mut store, "sessions", &[session("s1"), session("s2")]).unwrap();
        let loaded: Vec<SessionEntry> = load_collection(&store, "sessions");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].id, "s2");
    }

    #[test]
    fn storage_keys_fill_missing_fields() {
        let keys: StorageKeys = serde_json::from_str(r#"{"sessions":"sf.sessions"}"#).unwrap();
        assert_eq!(keys.sessions, "sf.sessions");
        assert_eq!(keys.scores, "scores");
        assert_eq!(keys.interruptions_migrated, "interruptionsMigrated");
    }
}
