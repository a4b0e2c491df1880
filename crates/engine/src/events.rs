// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit trail of job state transitions
//!
//! Every transition is reported to an injected [`EventSink`]. The
//! process-wide default is [`CsvEventLog`], an append-only CSV file
//! flushed after each record; tests substitute [`MemoryEventSink`].

use chrono::{Local, Utc};
use jsh_core::JobRecord;
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Fixed header of the audit CSV
pub const CSV_HEADER: &str =
    "Timestamp,JobID,JobName,Command,Priority,Status,ThreadID,CoreID,Duration(ms),Event";

/// A job state transition worth recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobEvent {
    Submitted,
    Started,
    Completed,
    Failed,
    Killed,
}

impl JobEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEvent::Submitted => "SUBMITTED",
            JobEvent::Started => "STARTED",
            JobEvent::Completed => "COMPLETED",
            JobEvent::Failed => "FAILED",
            JobEvent::Killed => "KILLED",
        }
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one record per job state transition
pub trait EventSink: Send + Sync {
    fn record(&self, job: &JobRecord, event: JobEvent);
}

/// Errors that can occur while initializing the audit log
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
}

/// Append-only CSV audit log
///
/// The header is written once per session. Writes are serialized by the
/// sink's own lock and flushed record by record, so a crash loses at most
/// the in-flight record. Initialization failure is fatal to the caller;
/// write failure after init is reported through `tracing` and swallowed.
pub struct CsvEventLog {
    file: Mutex<File>,
}

impl CsvEventLog {
    /// Default log path relative to the working directory
    pub const DEFAULT_PATH: &'static str = "logs/job_log.csv";

    pub fn create(path: &Path) -> Result<Self, EventLogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| EventLogError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| EventLogError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        writeln!(file, "{}", CSV_HEADER).map_err(|source| EventLogError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_record(&self, job: &JobRecord, event: JobEvent) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let name = job.name.as_deref().unwrap_or("-");
        let command = job.command.replace('"', "\"\"");
        let worker = job
            .worker_id
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string());
        let core = job
            .assigned_core
            .map(|c| c as i64)
            .unwrap_or(-1);

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(
            file,
            "{},{},{},\"{}\",{},{},{},{},{},{}",
            timestamp,
            job.id,
            name,
            command,
            job.priority.rank(),
            job.status.code(),
            worker,
            core,
            duration_ms(job),
            event,
        )?;
        file.flush()
    }
}

/// Milliseconds from start until end (or now, while still running);
/// 0 before the job has started.
fn duration_ms(job: &JobRecord) -> i64 {
    let Some(start) = job.start_time else {
        return 0;
    };
    let end = job.end_time.unwrap_or_else(Utc::now);
    (end - start).num_milliseconds().max(0)
}

impl EventSink for CsvEventLog {
    fn record(&self, job: &JobRecord, event: JobEvent) {
        if let Err(e) = self.write_record(job, event) {
            tracing::warn!(job_id = %job.id, event = %event, error = %e, "audit log write failed");
        }
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemoryEventSink {
    records: Mutex<Vec<(jsh_core::JobId, JobEvent)>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in write order
    pub fn snapshot(&self) -> Vec<(jsh_core::JobId, JobEvent)> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Events recorded for one job, in write order
    pub fn events_for(&self, id: jsh_core::JobId) -> Vec<JobEvent> {
        self.snapshot()
            .into_iter()
            .filter(|(job, _)| *job == id)
            .map(|(_, event)| event)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, job: &JobRecord, event: JobEvent) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((job.id, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsh_core::{JobId, JobPriority, JobStatus};
    use tempfile::TempDir;

    fn make_job(id: u64, command: &str) -> JobRecord {
        JobRecord::new(JobId(id), command, JobPriority::Medium, Utc::now())
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn writes_header_then_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("job_log.csv");
        let log = CsvEventLog::create(&path).unwrap();

        log.record(&make_job(1, "echo hello"), JobEvent::Submitted);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains(",1,-,\"echo hello\","));
        assert!(lines[1].ends_with(",SUBMITTED"));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/nested/job_log.csv");
        CsvEventLog::create(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unopenable_path_is_an_init_error() {
        let tmp = TempDir::new().unwrap();
        // A directory where the file should be
        let path = tmp.path().join("job_log.csv");
        std::fs::create_dir(&path).unwrap();
        assert!(CsvEventLog::create(&path).is_err());
    }

    #[test]
    fn commands_with_commas_stay_quoted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("job_log.csv");
        let log = CsvEventLog::create(&path).unwrap();

        log.record(&make_job(1, "echo a,b,c"), JobEvent::Submitted);

        let lines = read_lines(&path);
        assert!(lines[1].contains("\"echo a,b,c\""));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("job_log.csv");
        let log = CsvEventLog::create(&path).unwrap();

        log.record(&make_job(1, "echo \"hi\""), JobEvent::Submitted);

        let lines = read_lines(&path);
        assert!(lines[1].contains("\"echo \"\"hi\"\"\""));
    }

    #[test]
    fn duration_is_zero_until_started() {
        let job = make_job(1, "echo hi");
        assert_eq!(duration_ms(&job), 0);
    }

    #[test]
    fn duration_uses_end_time_when_set() {
        let mut job = make_job(1, "echo hi");
        let start = Utc::now();
        job.start_time = Some(start);
        job.end_time = Some(start + Duration::milliseconds(250));
        assert_eq!(duration_ms(&job), 250);
    }

    #[test]
    fn reopened_session_appends_after_existing_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("job_log.csv");

        {
            let log = CsvEventLog::create(&path).unwrap();
            log.record(&make_job(1, "echo one"), JobEvent::Submitted);
        }
        {
            let log = CsvEventLog::create(&path).unwrap();
            log.record(&make_job(2, "echo two"), JobEvent::Submitted);
        }

        let lines = read_lines(&path);
        // Header per session, records preserved in order
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[2], CSV_HEADER);
        assert!(lines[1].contains("\"echo one\""));
        assert!(lines[3].contains("\"echo two\""));
    }

    #[test]
    fn memory_sink_preserves_write_order() {
        let sink = MemoryEventSink::new();
        let job = make_job(1, "echo hi");

        sink.record(&job, JobEvent::Submitted);
        sink.record(&job, JobEvent::Started);
        sink.record(&job, JobEvent::Completed);

        assert_eq!(
            sink.events_for(JobId(1)),
            vec![JobEvent::Submitted, JobEvent::Started, JobEvent::Completed]
        );
    }

    #[test]
    fn terminal_row_reflects_status_code() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("job_log.csv");
        let log = CsvEventLog::create(&path).unwrap();

        let mut job = make_job(1, "false");
        job.status = JobStatus::Failed;
        log.record(&job, JobEvent::Failed);

        let lines = read_lines(&path);
        let fields: Vec<&str> = lines[1].split(',').collect();
        // Status column is the numeric code, FAILED = 3
        assert_eq!(fields[5], "3");
    }
}
