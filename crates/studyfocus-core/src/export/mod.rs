//! Export of persisted collections as JSON or CSV.
//!
//! Collections are read as raw JSON values, so fields this crate does not
//! model still appear in the output. Reading never fails: a missing or
//! malformed collection exports as empty.

mod artifact;
mod csv;

pub use artifact::ExportArtifact;
pub use csv::{encode_cell, render_csv_block};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::storage::{load_raw_collection, KeyValueStore, StorageKeys};
use crate::time::parse_instant;

/// A persisted collection that can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Tasks,
    Sessions,
    Scores,
    Interruptions,
    Records,
    Rules,
}

impl ExportType {
    pub const ALL: [ExportType; 6] = [
        ExportType::Tasks,
        ExportType::Sessions,
        ExportType::Scores,
        ExportType::Interruptions,
        ExportType::Records,
        ExportType::Rules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportType::Tasks => "tasks",
            ExportType::Sessions => "sessions",
            ExportType::Scores => "scores",
            ExportType::Interruptions => "interruptions",
            ExportType::Records => "records",
            ExportType::Rules => "rules",
        }
    }

    /// Field that places an entry in time, if the collection has one.
    pub fn date_field(self) -> Option<&'static str> {
        match self {
            ExportType::Sessions => Some("endedAt"),
            ExportType::Records | ExportType::Scores | ExportType::Interruptions => {
                Some("createdAt")
            }
            ExportType::Tasks | ExportType::Rules => None,
        }
    }

    /// Store key backing this collection.
    pub fn storage_key(self, keys: &StorageKeys) -> &str {
        match self {
            ExportType::Tasks => &keys.tasks,
            ExportType::Sessions => &keys.sessions,
            ExportType::Scores => &keys.scores,
            ExportType::Interruptions => &keys.interruptions,
            ExportType::Records => &keys.records,
            ExportType::Rules => &keys.rules,
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "export_type".into(),
                message: format!("unknown collection '{s}'"),
            })
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Inclusive instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// # Errors
    /// Returns an error if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

/// What to export and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_types: Vec<ExportType>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl ExportOptions {
    /// Every collection, no date filter.
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            include_types: ExportType::ALL.to_vec(),
            date_range: None,
        }
    }

    /// Only the listed collections, in the listed order.
    pub fn only(format: ExportFormat, types: &[ExportType]) -> Self {
        Self {
            format,
            include_types: types.to_vec(),
            date_range: None,
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// Read one collection, applying the date filter when the type has a date field.
pub fn collect_rows<S: KeyValueStore + ?Sized>(
    store: &S,
    keys: &StorageKeys,
    export_type: ExportType,
    date_range: Option<&DateRange>,
) -> Vec<Value> {
    let rows = load_raw_collection(store, export_type.storage_key(keys));
    match (export_type.date_field(), date_range) {
        (Some(field), Some(range)) => rows
            .into_iter()
            .filter(|row| {
                row.get(field)
                    .and_then(Value::as_str)
                    .and_then(parse_instant)
                    .is_some_and(|at| range.contains(&at))
            })
            .collect(),
        _ => rows,
    }
}

/// Render the requested collections.
///
/// JSON is a pretty-printed object keyed by collection name. CSV is one
/// `# name` block per non-empty collection, blocks separated by a blank
/// line, and the empty string when nothing has rows.
pub fn export_data<S: KeyValueStore + ?Sized>(
    store: &S,
    keys: &StorageKeys,
    options: &ExportOptions,
) -> String {
    let collections: Vec<(ExportType, Vec<Value>)> = options
        .include_types
        .iter()
        .map(|&t| (t, collect_rows(store, keys, t, options.date_range.as_ref())))
        .collect();

    match options.format {
        ExportFormat::Json => {
            let mut root = Map::new();
            for (export_type, rows) in collections {
                root.insert(export_type.as_str().to_string(), Value::Array(rows));
            }
            // Serializing a Value cannot fail.
            serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default()
        }
        ExportFormat::Csv => {
            let blocks: Vec<String> = collections
                .iter()
                .filter(|(_, rows)| !rows.is_empty())
                .map(|(export_type, rows)| {
                    tracing::debug!(collection = %export_type, rows = rows.len(), "csv block");
                    format!("# {export_type}\n{}", render_csv_block(rows))
                })
                .collect();
            blocks.join("\n\n")
        }
    }
}
