//! Fire-and-forget activity recording.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::OutputFormat;

/// What was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// One employee's payslip.
    Render,
    /// A batch of payslips.
    Batch,
}

/// One activity record. Carries counts only, never employee identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    /// Unique id of the event.
    pub id: Uuid,
    /// When the work finished.
    pub at: DateTime<Utc>,
    /// Kind of work.
    pub action: ActivityAction,
    /// Requested design identifier.
    pub design: String,
    /// Requested formats.
    pub format: OutputFormat,
    /// Payslips written.
    pub succeeded: usize,
    /// Payslips that failed.
    pub failed: usize,
}

impl ActivityEvent {
    /// Creates an event stamped now.
    pub fn new(
        action: ActivityAction,
        design: impl Into<String>,
        format: OutputFormat,
        succeeded: usize,
        failed: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            action,
            design: design.into(),
            format,
            succeeded,
            failed,
        }
    }
}

/// Why a sink could not record an event.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// The sink's storage failed.
    #[error("failed to write activity log '{}': {source}", .path.display())]
    Io {
        /// The log file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The event could not be encoded.
    #[error("failed to encode activity event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Receives activity events.
///
/// Callers log and ignore errors; a failing sink never aborts rendering.
pub trait ActivitySink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &ActivityEvent) -> Result<(), ActivityError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivity;

impl ActivitySink for NoopActivity {
    fn record(&self, _event: &ActivityEvent) -> Result<(), ActivityError> {
        Ok(())
    }
}

/// Appends events to a file as JSON lines.
#[derive(Debug)]
pub struct JsonLinesActivity {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesActivity {
    /// Creates a sink appending to `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivitySink for JsonLinesActivity {
    fn record(&self, event: &ActivityEvent) -> Result<(), ActivityError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.lock.lock();
        let io_error = |source: io::Error| ActivityError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        file.write_all(&line).map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_json_lines_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesActivity::new(dir.path().join("activity.jsonl"));

        sink.record(&ActivityEvent::new(ActivityAction::Render, "default", OutputFormat::Pdf, 1, 0))
            .unwrap();
        sink.record(&ActivityEvent::new(
            ActivityAction::Batch,
            "template_sample1",
            OutputFormat::Both,
            3,
            1,
        ))
        .unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["action"], "batch");
        assert_eq!(second["format"], "both");
        assert_eq!(second["failed"], 1);
    }

    #[test]
    fn test_json_lines_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesActivity::new(dir.path().join("missing").join("activity.jsonl"));
        let result =
            sink.record(&ActivityEvent::new(ActivityAction::Render, "default", OutputFormat::Excel, 1, 0));
        assert!(matches!(result, Err(ActivityError::Io { .. })));
    }
}
