//! # StudyFocus Core Library
//!
//! Data core of the StudyFocus study timer. The UI owns the countdown and
//! the forms; this crate owns what happens to the data they produce.
//!
//! ## Architecture
//!
//! - **Scoring**: converts a finished session into points
//! - **Stats**: daily summaries, trailing trends and range totals in local calendar days
//! - **Migration**: one-time backfill of `sessionId` on legacy interruptions
//! - **Export**: JSON or CSV rendering of persisted collections
//! - **Ledger**: typed writers that keep the record invariants
//! - **Storage**: a key-value seam with in-memory and SQLite adapters, plus TOML config
//!
//! ## Key Components
//!
//! - [`calculate_session_points`]: the scoring formula
//! - [`TemporalAggregator`]: calendar-day aggregation in a chosen time zone
//! - [`InterruptionMigrator`]: flag-guarded interruption backfill
//! - [`export_data`] and [`ExportArtifact`]: export rendering and files
//! - [`Ledger`]: session, score, interruption and record writers
//! - [`KeyValueStore`]: the persistence trait hosts implement

pub mod error;
pub mod export;
pub mod ledger;
pub mod migration;
pub mod models;
pub mod scoring;
pub mod stats;
pub mod storage;
pub mod time;

pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use export::{
    export_data, DateRange, ExportArtifact, ExportFormat, ExportOptions, ExportType,
};
pub use ledger::{CompletedTimer, Ledger, NewInterruption};
pub use migration::{
    link_raw_interruptions, migrate_interruptions, InterruptionMigrator, MigrationOutcome,
    MigrationState,
};
pub use models::{
    DailySummary, DailyTrendPoint, InterruptionLog, RangeStats, RecordEntry, Rule, ScoreEntry,
    SessionEntry, Task, TaskStatus,
};
pub use scoring::{calculate_session_points, score_breakdown, ScoreBreakdown, ScoringInput};
pub use stats::{
    build_weekly_trend, build_weekly_trend_default, create_daily_summaries, format_date,
    get_stats_for_date_range, TemporalAggregator, DEFAULT_TREND_DAYS,
};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore, StorageKeys};
pub use time::parse_instant;
