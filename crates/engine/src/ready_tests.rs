// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jsh_core::JobPriority;

fn table(specs: &[(u64, &str, JobPriority)]) -> (ReadySet, HashMap<JobId, JobRecord>) {
    let now = Utc::now();
    let mut ready = ReadySet::new();
    let mut jobs = HashMap::new();
    for &(id, command, priority) in specs {
        let job = JobRecord::new(JobId(id), command, priority, now);
        ready.push(job.id);
        jobs.insert(job.id, job);
    }
    (ready, jobs)
}

#[test]
fn remove_is_positional_and_reports_presence() {
    let (mut ready, _) = table(&[
        (1, "echo a", JobPriority::Medium),
        (2, "echo b", JobPriority::Medium),
    ]);
    assert!(ready.remove(JobId(1)));
    assert!(!ready.remove(JobId(1)));
    assert_eq!(ready.len(), 1);
    assert!(ready.contains(JobId(2)));
}

#[test]
fn priority_first_picks_highest_score() {
    let (ready, jobs) = table(&[
        (1, "echo a", JobPriority::Low),
        (2, "echo b", JobPriority::Critical),
        (3, "echo c", JobPriority::High),
    ]);
    let picked = ready.select(
        SchedulingPolicy::PriorityFirst,
        &jobs,
        &HashMap::new(),
        Utc::now(),
    );
    assert_eq!(picked, Some(JobId(2)));
}

#[test]
fn priority_first_ties_break_on_submission_order() {
    let (ready, jobs) = table(&[
        (1, "echo a", JobPriority::Medium),
        (2, "echo a", JobPriority::Medium),
    ]);
    let picked = ready.select(
        SchedulingPolicy::PriorityFirst,
        &jobs,
        &HashMap::new(),
        Utc::now(),
    );
    assert_eq!(picked, Some(JobId(1)));
}

#[test]
fn shortest_job_first_picks_smallest_estimate() {
    let (ready, jobs) = table(&[
        (1, "make everything", JobPriority::Critical),
        (2, "sleep 2", JobPriority::Low),
        (3, "grep x /var/log", JobPriority::High),
    ]);
    let picked = ready.select(
        SchedulingPolicy::ShortestJobFirst,
        &jobs,
        &HashMap::new(),
        Utc::now(),
    );
    assert_eq!(picked, Some(JobId(2)));
}

#[test]
fn round_robin_is_fifo_within_top_priority() {
    let (ready, jobs) = table(&[
        (1, "echo a", JobPriority::Low),
        (2, "echo b", JobPriority::High),
        (3, "echo c", JobPriority::High),
    ]);
    let picked = ready.select(
        SchedulingPolicy::RoundRobin,
        &jobs,
        &HashMap::new(),
        Utc::now(),
    );
    assert_eq!(picked, Some(JobId(2)));
}

#[test]
fn fair_share_prefers_least_consumed_group() {
    let (ready, mut jobs) = table(&[
        (10, "echo a", JobPriority::Medium),
        (11, "echo b", JobPriority::Medium),
    ]);
    // Put both jobs in distinct array groups with uneven usage
    jobs.get_mut(&JobId(10)).unwrap().array_job_id = Some(JobId(10));
    jobs.get_mut(&JobId(11)).unwrap().array_job_id = Some(JobId(11));

    let mut consumed = HashMap::new();
    consumed.insert(JobId(10), 5_000);
    consumed.insert(JobId(11), 100);

    let picked = ready.select(SchedulingPolicy::FairShare, &jobs, &consumed, Utc::now());
    assert_eq!(picked, Some(JobId(11)));
}

#[test]
fn fair_share_treats_unseen_groups_as_zero() {
    let (ready, jobs) = table(&[
        (1, "echo a", JobPriority::Medium),
        (2, "echo b", JobPriority::Medium),
    ]);
    let mut consumed = HashMap::new();
    consumed.insert(JobId(1), 1_000);

    let picked = ready.select(SchedulingPolicy::FairShare, &jobs, &consumed, Utc::now());
    assert_eq!(picked, Some(JobId(2)));
}

#[test]
fn select_on_empty_set_returns_none() {
    let ready = ReadySet::new();
    let picked = ready.select(
        SchedulingPolicy::PriorityFirst,
        &HashMap::new(),
        &HashMap::new(),
        Utc::now(),
    );
    assert_eq!(picked, None);
}
