// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System-wide statistics
//!
//! Monotonic counters are bumped at each transition; averages and
//! throughput are derived on demand from the completed set.

use chrono::{DateTime, Utc};
use jsh_core::{JobRecord, JobStatus};
use serde::Serialize;

/// Monotonic transition counters kept under the scheduler lock
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsCounters {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub killed: u64,
}

/// Point-in-time statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub total_jobs_submitted: u64,
    pub total_jobs_completed: u64,
    pub total_jobs_failed: u64,
    pub total_jobs_killed: u64,
    pub average_turnaround_ms: f64,
    pub average_wait_ms: f64,
    /// Completed jobs per elapsed minute; 0 before the first full minute
    pub system_throughput: f64,
    /// Sum of simulated memory over currently running jobs
    pub current_memory_usage_mb: u64,
    pub start_time: DateTime<Utc>,
}

/// Derive a stats snapshot from the counters and job sets
pub fn snapshot<'a>(
    counters: &StatsCounters,
    completed: impl Iterator<Item = &'a JobRecord>,
    active: impl Iterator<Item = &'a JobRecord>,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SystemStats {
    let mut turnaround_total = 0i64;
    let mut wait_total = 0i64;
    let mut measured = 0u64;

    for job in completed {
        let (Some(start), Some(end)) = (job.start_time, job.end_time) else {
            continue;
        };
        turnaround_total += (end - job.submit_time).num_milliseconds();
        wait_total += (start - job.submit_time).num_milliseconds();
        measured += 1;
    }

    let (average_turnaround_ms, average_wait_ms) = if measured > 0 {
        (
            turnaround_total as f64 / measured as f64,
            wait_total as f64 / measured as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let elapsed_minutes = (now - start_time).num_minutes();
    let system_throughput = if elapsed_minutes > 0 {
        counters.completed as f64 / elapsed_minutes as f64
    } else {
        0.0
    };

    let current_memory_usage_mb = active
        .filter(|job| job.status == JobStatus::Running)
        .map(|job| job.memory_usage_mb)
        .sum();

    SystemStats {
        total_jobs_submitted: counters.submitted,
        total_jobs_completed: counters.completed,
        total_jobs_failed: counters.failed,
        total_jobs_killed: counters.killed,
        average_turnaround_ms,
        average_wait_ms,
        system_throughput,
        current_memory_usage_mb,
        start_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsh_core::{JobId, JobPriority};

    fn finished_job(id: u64, submit: DateTime<Utc>, wait_ms: i64, run_ms: i64) -> JobRecord {
        let mut job = JobRecord::new(JobId(id), "echo hi", JobPriority::Medium, submit);
        let start = submit + Duration::milliseconds(wait_ms);
        job.start_time = Some(start);
        job.end_time = Some(start + Duration::milliseconds(run_ms));
        job.status = JobStatus::Completed;
        job
    }

    #[test]
    fn empty_completed_set_yields_zero_averages() {
        let now = Utc::now();
        let stats = snapshot(&StatsCounters::default(), std::iter::empty(), std::iter::empty(), now, now);
        assert_eq!(stats.average_turnaround_ms, 0.0);
        assert_eq!(stats.average_wait_ms, 0.0);
        assert_eq!(stats.system_throughput, 0.0);
    }

    #[test]
    fn averages_over_completed_jobs() {
        let now = Utc::now();
        let jobs = vec![
            finished_job(1, now, 100, 400), // turnaround 500, wait 100
            finished_job(2, now, 300, 400), // turnaround 700, wait 300
        ];
        let stats = snapshot(&StatsCounters::default(), jobs.iter(), std::iter::empty(), now, now);
        assert_eq!(stats.average_turnaround_ms, 600.0);
        assert_eq!(stats.average_wait_ms, 200.0);
    }

    #[test]
    fn throughput_is_zero_under_one_minute() {
        let start = Utc::now();
        let counters = StatsCounters {
            completed: 10,
            ..Default::default()
        };
        let stats = snapshot(
            &counters,
            std::iter::empty(),
            std::iter::empty(),
            start,
            start + Duration::seconds(59),
        );
        assert_eq!(stats.system_throughput, 0.0);
    }

    #[test]
    fn throughput_is_jobs_per_minute() {
        let start = Utc::now();
        let counters = StatsCounters {
            completed: 10,
            ..Default::default()
        };
        let stats = snapshot(
            &counters,
            std::iter::empty(),
            std::iter::empty(),
            start,
            start + Duration::minutes(5),
        );
        assert_eq!(stats.system_throughput, 2.0);
    }

    #[test]
    fn memory_sums_only_running_jobs() {
        let now = Utc::now();
        let mut running = JobRecord::new(JobId(1), "echo hi", JobPriority::Medium, now);
        running.status = JobStatus::Running;
        running.memory_usage_mb = 64;

        let mut suspended = JobRecord::new(JobId(2), "echo hi", JobPriority::Medium, now);
        suspended.status = JobStatus::Suspended;
        suspended.memory_usage_mb = 128;

        let active = vec![running, suspended];
        let stats = snapshot(
            &StatsCounters::default(),
            std::iter::empty(),
            active.iter(),
            now,
            now,
        );
        assert_eq!(stats.current_memory_usage_mb, 64);
    }

    #[test]
    fn jobs_without_timings_are_skipped() {
        let now = Utc::now();
        let unfinished = JobRecord::new(JobId(1), "echo hi", JobPriority::Medium, now);
        let jobs = vec![unfinished, finished_job(2, now, 50, 50)];
        let stats = snapshot(&StatsCounters::default(), jobs.iter(), std::iter::empty(), now, now);
        assert_eq!(stats.average_wait_ms, 50.0);
        assert_eq!(stats.average_turnaround_ms, 100.0);
    }
}
