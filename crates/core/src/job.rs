// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records and their lifecycle vocabulary
//!
//! A [`JobRecord`] carries the immutable identity of a submitted job plus
//! the mutable runtime state the scheduler updates as the job moves through
//! its lifecycle. All collections in the scheduler hold [`JobId`] handles;
//! the record itself lives in the scheduler's owning table.

use crate::estimate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Monotonically increasing job identifier, assigned once at submission
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(JobId)
    }
}

/// Scheduling priority of a job
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl JobPriority {
    /// Numeric rank, also the value written to the audit log
    pub fn rank(&self) -> u8 {
        match self {
            JobPriority::Low => 0,
            JobPriority::Medium => 1,
            JobPriority::High => 2,
            JobPriority::Critical => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::Low => "LOW",
            JobPriority::Medium => "MEDIUM",
            JobPriority::High => "HIGH",
            JobPriority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(JobPriority::Low),
            "MEDIUM" => Ok(JobPriority::Medium),
            "HIGH" => Ok(JobPriority::High),
            "CRITICAL" => Ok(JobPriority::Critical),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Killed,
    Suspended,
    WaitingDeps,
}

impl JobStatus {
    /// Numeric code written to the audit log
    pub fn code(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
            JobStatus::Killed => 4,
            JobStatus::Suspended => 5,
            JobStatus::WaitingDeps => 6,
        }
    }

    /// COMPLETED, FAILED and KILLED are terminal; no transition leaves them
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Killed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Killed => "KILLED",
            JobStatus::Suspended => "SUSPENDED",
            JobStatus::WaitingDeps => "WAITING_DEPS",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the job was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    #[default]
    Interactive,
    Batch,
    ArrayJob,
}

/// Advisory resource limits declared for a job
///
/// The scheduler records these and reports against them; it does not
/// enforce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_mb: u64,
    pub max_runtime_secs: u64,
    pub max_cpu_cores: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_mb: 1024,
            max_runtime_secs: 3600,
            max_cpu_cores: 1,
        }
    }
}

/// One submitted job: identity, declared shape, and runtime state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: Option<String>,
    pub command: String,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub job_type: JobType,
    pub limits: ResourceLimits,

    /// Jobs that must reach COMPLETED before this one is eligible
    pub dependencies: HashSet<JobId>,
    /// Reverse index, maintained at submission time
    pub dependents: HashSet<JobId>,

    /// Core held while running; None until dispatch
    pub assigned_core: Option<usize>,
    /// All cores held, for multi-core jobs
    pub assigned_cores: Vec<usize>,
    /// Index of the worker thread that ran this job
    pub worker_id: Option<usize>,

    pub submit_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub actual_runtime_ms: i64,

    // Simulated metrics, derived from the command text at start
    pub cpu_utilization: f64,
    pub memory_usage_mb: u64,
    pub context_switches: u32,

    pub process_id: Option<i32>,
    pub exit_code: Option<i32>,

    pub array_job_id: Option<JobId>,
    pub array_task_id: Option<u32>,
}

impl JobRecord {
    pub fn new(
        id: JobId,
        command: impl Into<String>,
        priority: JobPriority,
        submit_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: None,
            command: command.into(),
            priority,
            status: JobStatus::Pending,
            job_type: JobType::Interactive,
            limits: ResourceLimits::default(),
            dependencies: HashSet::new(),
            dependents: HashSet::new(),
            assigned_core: None,
            assigned_cores: Vec::new(),
            worker_id: None,
            submit_time,
            start_time: None,
            end_time: None,
            actual_runtime_ms: 0,
            cpu_utilization: 0.0,
            memory_usage_mb: 0,
            context_switches: 0,
            process_id: None,
            exit_code: None,
            array_job_id: None,
            array_task_id: None,
        }
    }

    /// Estimated runtime derived from the command text
    pub fn estimated_runtime_secs(&self) -> u64 {
        estimate::estimated_runtime_secs(&self.command)
    }

    /// True when every dependency is present and COMPLETED
    pub fn dependencies_satisfied(&self, jobs: &HashMap<JobId, JobRecord>) -> bool {
        self.dependencies.iter().all(|dep| {
            jobs.get(dep)
                .map(|j| j.status == JobStatus::Completed)
                .unwrap_or(false)
        })
    }

    /// Dynamic dispatch score; higher dispatches first under PRIORITY_FIRST.
    ///
    /// Non-monotonic in time: the aging term grows as the job waits, so the
    /// score must be recomputed at the moment of selection.
    pub fn priority_score(&self, now: DateTime<Utc>) -> f64 {
        let mut score = f64::from(self.priority.rank());

        // Shorter estimated jobs get a small boost, normalized by minutes
        let estimated = self.estimated_runtime_secs() as f64;
        score += 0.1 / (1.0 + estimated / 60.0);

        // Aging boost for jobs waiting in the queue
        let wait_minutes = (now - self.submit_time).num_minutes().max(0) as f64;
        score += wait_minutes * 0.01;

        if self.status == JobStatus::WaitingDeps {
            score -= 1.0;
        }

        if self.job_type == JobType::Interactive {
            score += 0.2;
        }

        if self.priority == JobPriority::Critical {
            score += 2.0;
        }

        score
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
