// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ready set and dispatch-order policies
//!
//! Jobs whose dependencies are satisfied wait here in submission order.
//! Selection scans the set under the scheduler lock and recomputes scores
//! at the moment of choice, so the aging term in the priority score is
//! always fresh. Ties break on submission order, which keeps every
//! comparator total and stable.

use chrono::{DateTime, Utc};
use jsh_core::{JobId, JobRecord, SchedulingPolicy};
use std::collections::HashMap;

/// Submission-ordered collection of dispatchable jobs
#[derive(Debug, Clone, Default)]
pub struct ReadySet {
    order: Vec<JobId>,
}

impl ReadySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: JobId) {
        self.order.push(id);
    }

    /// Remove a specific job; true if it was present
    pub fn remove(&mut self, id: JobId) -> bool {
        if let Some(pos) = self.order.iter().position(|&j| j == id) {
            self.order.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.order.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = JobId> + '_ {
        self.order.iter().copied()
    }

    /// Choose the next job to dispatch under `policy` without removing it.
    ///
    /// `cpu_ms_by_group` carries cumulative runtime per array group for
    /// FAIR_SHARE; groups with no entry have consumed nothing yet.
    pub fn select(
        &self,
        policy: SchedulingPolicy,
        jobs: &HashMap<JobId, JobRecord>,
        cpu_ms_by_group: &HashMap<JobId, i64>,
        now: DateTime<Utc>,
    ) -> Option<JobId> {
        match policy {
            SchedulingPolicy::PriorityFirst => self.select_priority_first(jobs, now),
            SchedulingPolicy::ShortestJobFirst => self.select_shortest_first(jobs),
            SchedulingPolicy::RoundRobin => self.select_round_robin(jobs),
            SchedulingPolicy::FairShare => self.select_fair_share(jobs, cpu_ms_by_group),
        }
    }

    fn select_priority_first(
        &self,
        jobs: &HashMap<JobId, JobRecord>,
        now: DateTime<Utc>,
    ) -> Option<JobId> {
        let mut best: Option<(JobId, f64)> = None;
        for id in self.iter() {
            let Some(job) = jobs.get(&id) else { continue };
            let score = job.priority_score(now);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((id, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    fn select_shortest_first(&self, jobs: &HashMap<JobId, JobRecord>) -> Option<JobId> {
        let mut best: Option<(JobId, u64)> = None;
        for id in self.iter() {
            let Some(job) = jobs.get(&id) else { continue };
            let estimate = job.estimated_runtime_secs();
            match best {
                Some((_, shortest)) if estimate >= shortest => {}
                _ => best = Some((id, estimate)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// FIFO within the highest occupied priority level
    fn select_round_robin(&self, jobs: &HashMap<JobId, JobRecord>) -> Option<JobId> {
        let top = self
            .iter()
            .filter_map(|id| jobs.get(&id))
            .map(|job| job.priority)
            .max()?;
        self.iter()
            .find(|id| jobs.get(id).map(|j| j.priority) == Some(top))
    }

    /// Prefer the job whose group has consumed the least CPU time.
    /// A job's group is its array id, or its own id outside an array.
    fn select_fair_share(
        &self,
        jobs: &HashMap<JobId, JobRecord>,
        cpu_ms_by_group: &HashMap<JobId, i64>,
    ) -> Option<JobId> {
        let mut best: Option<(JobId, i64)> = None;
        for id in self.iter() {
            let Some(job) = jobs.get(&id) else { continue };
            let group = job.array_job_id.unwrap_or(job.id);
            let consumed = cpu_ms_by_group.get(&group).copied().unwrap_or(0);
            match best {
                Some((_, least)) if consumed >= least => {}
                _ => best = Some((id, consumed)),
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
#[path = "ready_tests.rs"]
mod tests;
