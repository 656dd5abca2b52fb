//! Downloadable export files.
//!
//! An [`ExportArtifact`] pairs rendered export text with a file name and
//! MIME type. [`ExportArtifact::save_to`] writes through a temporary file in
//! the target directory and renames it into place, so an interrupted write
//! never leaves a partial export and the temporary handle is always released.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{export_data, ExportFormat, ExportOptions};
use crate::error::{Result, ValidationError};
use crate::storage::{Config, KeyValueStore};
use crate::time::DAY_FORMAT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub filename: String,
    pub format: ExportFormat,
    pub contents: String,
}

impl ExportArtifact {
    pub fn new(filename: impl Into<String>, format: ExportFormat, contents: String) -> Self {
        Self {
            filename: filename.into(),
            format,
            contents,
        }
    }

    /// `{prefix}-YYYY-MM-DD.{json|csv}`
    pub fn default_filename(prefix: &str, format: ExportFormat, date: NaiveDate) -> String {
        format!("{prefix}-{}.{}", date.format(DAY_FORMAT), format.extension())
    }

    /// Render an export with the configured keys and file naming.
    pub fn export<S: KeyValueStore + ?Sized>(
        store: &S,
        config: &Config,
        options: &ExportOptions,
        date: NaiveDate,
    ) -> Self {
        let contents = export_data(store, &config.storage.keys, options);
        let filename =
            Self::default_filename(&config.export.filename_prefix, options.format, date);
        Self::new(filename, options.format, contents)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// True when there was nothing to export.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Write the artifact into `dir` under its file name.
    ///
    /// # Errors
    /// Returns an error if the file name is not a plain name or the write fails.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        if self.filename.is_empty()
            || self.filename.contains(['/', '\\'])
            || self.filename == "."
            || self.filename == ".."
        {
            return Err(ValidationError::InvalidValue {
                field: "filename".into(),
                message: format!("'{}' is not a plain file name", self.filename),
            }
            .into());
        }

        let dir = dir.as_ref();
        let target = dir.join(&self.filename);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.contents.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        tracing::debug!(path = %target.display(), bytes = self.contents.len(), "export saved");
        Ok(target)
    }
}
