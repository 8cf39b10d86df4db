//! Output module for writing university records and run summaries
//!
//! This module handles:
//! - Writing one pretty-printed JSON record per university under
//!   `root/country/city/name.json`, with every segment sanitized
//! - Writing flat per-country listings (`{code}_universities.json`)
//! - Writing the run summary

mod sanitize;
pub mod summary;

pub use sanitize::{sanitize_segment, MAX_SEGMENT_CHARS};
pub use summary::{CountryListing, CountrySummary, RunSummary};

use crate::record::{CountryRef, UniversityRecord, UniversityRef};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes records and summaries below a root directory
#[derive(Debug, Clone)]
pub struct RecordWriter {
    root: PathBuf,
    summary_file: String,
}

impl RecordWriter {
    /// Creates a writer rooted at `root`; directories are created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            summary_file: "scraping_summary.json".to_string(),
        }
    }

    /// Sets the file name of the run summary
    pub fn with_summary_file(mut self, name: &str) -> Self {
        self.summary_file = name.to_string();
        self
    }

    /// Path a record for `(country, city, name)` is written to
    pub fn record_path(&self, country: &str, city: &str, name: &str) -> PathBuf {
        self.root
            .join(sanitize_segment(country))
            .join(sanitize_segment(city))
            .join(format!("{}.json", sanitize_segment(name)))
    }

    /// Writes a record, replacing any previous file at the same path
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - The path written
    /// * `Err(OutputError)` - Directory creation, serialization or write failed
    pub fn try_write(
        &self,
        record: &UniversityRecord,
        country: &str,
        city: &str,
        name: &str,
    ) -> OutputResult<PathBuf> {
        let path = self.record_path(country, city, name);
        write_json(&path, record)?;
        tracing::debug!("Wrote record {}", path.display());
        Ok(path)
    }

    /// Writes a record; failures are logged and reported as `false`
    pub fn write(&self, record: &UniversityRecord, country: &str, city: &str, name: &str) -> bool {
        match self.try_write(record, country, city, name) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to write record for {}: {}", name, e);
                false
            }
        }
    }

    /// Writes `root/{code}_universities.json` for one country
    pub fn write_country_listing(
        &self,
        country: &CountryRef,
        universities: &[UniversityRef],
        scraped_at: DateTime<Utc>,
    ) -> OutputResult<PathBuf> {
        let path = self
            .root
            .join(format!("{}_universities.json", sanitize_segment(&country.code)));
        write_json(&path, &CountryListing::new(country, universities, scraped_at))?;
        tracing::info!(
            "Saved {} universities for {} to {}",
            universities.len(),
            country.name,
            path.display()
        );
        Ok(path)
    }

    /// Writes the run summary to `root/<summary-file>`
    pub fn write_run_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        let path = self.root.join(&self.summary_file);
        write_json(&path, summary)?;
        tracing::info!("Saved run summary to {}", path.display());
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| OutputError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    std::fs::write(path, json).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}
