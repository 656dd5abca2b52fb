//! Persisted record types.
//!
//! Every collection in the store is a JSON array of one of these records,
//! serialized in camelCase. Timestamps are kept as the strings that were
//! written and parsed on demand through [`crate::time::parse_instant_in`],
//! so a malformed value survives a load/save cycle untouched.

use serde::{Deserialize, Serialize};

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
}

/// A study task created by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub planned_minutes: u32,
    #[serde(default)]
    pub status: TaskStatus,
}

/// One completed timer run against a task.
///
/// Written once when the timer stops with a non-zero elapsed time and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub id: String,
    pub task_id: String,
    pub seconds: u64,
    #[serde(default)]
    pub pause_count: u32,
    pub started_at: String,
    pub ended_at: String,
}

/// Point value awarded for a session. At most one per `session_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: String,
    pub session_id: String,
    pub task_id: String,
    pub points: u32,
    /// Focus seconds of the scored session. Missing on older or imported scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
    #[serde(default)]
    pub pause_count: u32,
    pub created_at: String,
}

/// A logged pause with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptionLog {
    pub id: String,
    pub reason_id: String,
    /// Pause length in seconds.
    #[serde(default)]
    pub duration: u64,
    pub created_at: String,
    pub task_id: String,
    /// Session the pause happened in. `None` only on legacy records; an
    /// empty string is a present value and is left alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Fields written by other app versions, carried through rewrites.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InterruptionLog {
    pub fn needs_session_backfill(&self) -> bool {
        self.session_id.is_none()
    }
}

/// User-facing report snapshot written when a session is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    pub id: String,
    pub task_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    pub minutes: u32,
    #[serde(default = "default_rating")]
    pub rating: u8,
    #[serde(default)]
    pub mistake_count: u32,
    #[serde(default)]
    pub writing_stars: u8,
    #[serde(default)]
    pub review_checked: bool,
    #[serde(default)]
    pub fix_checked: bool,
    #[serde(default)]
    pub preview_checked: bool,
    #[serde(default)]
    pub note: String,
    pub created_at: String,
    pub points: u32,
}

fn default_rating() -> u8 {
    3
}

/// Settings-owned rule. The core never looks inside.
pub type Rule = serde_json::Value;

/// Activity bucket for one calendar day. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// `YYYY-MM-DD` in the aggregator's calendar zone.
    pub date: String,
    pub total_seconds: u64,
    pub total_points: u64,
    pub session_count: u32,
    pub score_count: u32,
}

impl DailySummary {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            total_seconds: 0,
            total_points: 0,
            session_count: 0,
            score_count: 0,
        }
    }
}

/// One day on a trend chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrendPoint {
    pub date: String,
    pub minutes: u64,
}

/// Totals over an arbitrary date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub total_minutes: u64,
    pub total_points: u64,
    pub session_count: u32,
}
