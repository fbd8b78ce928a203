//! Serializable record of a repeat run.
//!
//! A [`RunReport`] holds one [`IterationRecord`] per invocation, in order. It
//! is written as pretty JSON when the caller asks for it.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::InvocationStatus;

/// Errors from writing or reading a report file.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Outcome of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based position in the run.
    pub iteration: u64,
    /// Counter value printed after this invocation.
    pub remaining: u64,
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    /// Why the command could not be started, if it wasn't.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IterationRecord {
    pub fn new(
        iteration: u64,
        remaining: u64,
        status: &InvocationStatus,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let error = match status {
            InvocationStatus::NotLaunched { reason, .. } => Some(reason.clone()),
            _ => None,
        };
        Self {
            iteration,
            remaining,
            exit_code: status.code(),
            success: status.is_success(),
            duration_ms: duration_ms(elapsed),
            started_at,
            error,
        }
    }
}

/// All invocations of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Repetition count given by the caller.
    pub requested: u64,
    /// Command line of each invocation, program first.
    pub command: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub iterations: Vec<IterationRecord>,
}

impl RunReport {
    pub fn new(requested: u64, command: Vec<String>) -> Self {
        Self {
            requested,
            command,
            started_at: Utc::now(),
            finished_at: None,
            iterations: Vec::new(),
        }
    }

    pub fn push(&mut self, record: IterationRecord) {
        self.iterations.push(record);
    }

    /// Stamps the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn invocations(&self) -> usize {
        self.iterations.len()
    }

    pub fn failures(&self) -> usize {
        self.iterations.iter().filter(|r| !r.success).count()
    }

    /// Exit code of the last invocation, or 0 if nothing ran.
    pub fn exit_code(&self) -> i32 {
        self.iterations.last().map_or(0, |r| r.exit_code)
    }

    /// Writes the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
