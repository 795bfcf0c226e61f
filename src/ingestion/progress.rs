//! Progress Tracker
//!
//! Overwrites a single JSON snapshot after every completed unit of work. The
//! file is replaced atomically (write to a sibling, then rename) so readers
//! never observe a half-written document.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::IngestError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub units_completed: u64,
    pub total_units: u64,
    pub records_so_far: u64,
    pub timestamp: DateTime<Utc>,
    /// 0 to 100, two decimals
    pub completion_fraction: f64,
}

impl ProgressSnapshot {
    pub fn new(
        units_completed: u64,
        total_units: u64,
        records_so_far: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            units_completed,
            total_units,
            records_so_far,
            timestamp,
            completion_fraction: completion_fraction(units_completed, total_units),
        }
    }

    /// Staleness is the reader's call; the tracker never enforces it.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match chrono::Duration::from_std(threshold) {
            Ok(threshold) => now.signed_duration_since(self.timestamp) > threshold,
            Err(_) => false,
        }
    }
}

/// Percentage of completed units, rounded to 2 places. Zero when there is nothing to do.
pub fn completion_fraction(units_completed: u64, total_units: u64) -> f64 {
    if total_units == 0 {
        return 0.0;
    }
    let percent = units_completed as f64 / total_units as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    path: PathBuf,
}

impl ProgressTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(
        &self,
        units_completed: u64,
        total_units: u64,
        records_so_far: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<ProgressSnapshot, IngestError> {
        let snapshot = ProgressSnapshot::new(units_completed, total_units, records_so_far, timestamp);
        let body = serde_json::to_vec_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        Ok(snapshot)
    }

    /// Latest snapshot, `None` if no run has written one yet.
    pub async fn load(&self) -> Result<Option<ProgressSnapshot>, IngestError> {
        let body = match tokio::fs::read(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        Ok(Some(serde_json::from_slice(&body)?))
    }

    fn io_error(&self, source: std::io::Error) -> IngestError {
        IngestError::Progress {
            path: self.path.display().to_string(),
            source,
        }
    }
}
