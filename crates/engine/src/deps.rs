// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse dependency index
//!
//! Maps a job id to the set of jobs that declared it as a dependency.
//! Consulted when a job completes to enumerate promotion candidates; each
//! candidate is then re-checked against the full job table, because one
//! dependency completing is necessary but not sufficient.

use jsh_core::JobId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    dependents: HashMap<JobId, HashSet<JobId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `job` depends on each id in `deps`
    pub fn register(&mut self, job: JobId, deps: &HashSet<JobId>) {
        for &dep in deps {
            self.dependents.entry(dep).or_default().insert(job);
        }
    }

    /// Jobs that declared `id` as a dependency
    pub fn dependents_of(&self, id: JobId) -> Vec<JobId> {
        self.dependents
            .get(&id)
            .map(|set| {
                let mut ids: Vec<JobId> = set.iter().copied().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> HashSet<JobId> {
        raw.iter().copied().map(JobId).collect()
    }

    #[test]
    fn registers_reverse_edges() {
        let mut index = DependencyIndex::new();
        index.register(JobId(3), &ids(&[1, 2]));

        assert_eq!(index.dependents_of(JobId(1)), vec![JobId(3)]);
        assert_eq!(index.dependents_of(JobId(2)), vec![JobId(3)]);
    }

    #[test]
    fn multiple_waiters_on_one_dependency() {
        let mut index = DependencyIndex::new();
        index.register(JobId(2), &ids(&[1]));
        index.register(JobId(3), &ids(&[1]));

        assert_eq!(index.dependents_of(JobId(1)), vec![JobId(2), JobId(3)]);
    }

    #[test]
    fn no_dependents_yields_empty() {
        let index = DependencyIndex::new();
        assert!(index.dependents_of(JobId(9)).is_empty());
    }

    #[test]
    fn registering_is_idempotent() {
        let mut index = DependencyIndex::new();
        index.register(JobId(2), &ids(&[1]));
        index.register(JobId(2), &ids(&[1]));
        assert_eq!(index.dependents_of(JobId(1)), vec![JobId(2)]);
    }
}
