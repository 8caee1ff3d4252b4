//! CSV log of live photometry measurements.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use roi_core::PhotometryReport;
use serde::Serialize;
use tracing::info;

/// One row of the measurement log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    /// Capture sequence number
    pub sequence: u64,
    /// Capture time
    pub captured_at: DateTime<Utc>,
    /// Source circle radius in pixels
    pub radius_px: f64,
    /// Source sum
    pub source_sum: f64,
    /// Source mean
    pub source_mean: f64,
    /// Background mean
    pub background_mean: f64,
    /// Net source signal
    pub net: f64,
    /// Unit of the measured quantities
    pub unit: &'static str,
}

impl MeasurementRecord {
    /// Flatten a report for logging.
    pub fn from_report(sequence: u64, captured_at: DateTime<Utc>, report: &PhotometryReport) -> Self {
        Self {
            sequence,
            captured_at,
            radius_px: report.source_radius,
            source_sum: report.source.sum,
            source_mean: report.source.mean,
            background_mean: report.background.mean,
            net: report.net,
            unit: report.unit,
        }
    }
}

/// File name for a log started at `now`.
pub fn log_file_name(now: DateTime<Utc>) -> String {
    format!("photometry_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Append-only CSV writer with a header row.
pub struct MeasurementLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

impl MeasurementLog {
    /// Create a new log file inside `dir`, creating the directory if needed.
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
        }
        Self::create(dir.join(log_file_name(Utc::now())))
    }

    /// Create (or truncate) a log at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create measurement log '{}'", path.display()))?;
        info!(path = %path.display(), "Measurement log opened");
        Ok(Self {
            path,
            writer,
            rows: 0,
        })
    }

    /// Append a row.
    pub fn append(&mut self, record: &MeasurementRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .with_context(|| format!("Failed to write to '{}'", self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered rows to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Location of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl std::fmt::Debug for MeasurementLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementLog")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish()
    }
}
