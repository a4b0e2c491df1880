// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical core accounting
//!
//! A fixed-size table of core slots. Allocation is bookkeeping only; it
//! does not pin any OS thread. All operations run under the scheduler's
//! lock, so the table itself carries no synchronization.

use chrono::{DateTime, Utc};
use jsh_core::JobId;

#[derive(Debug, Clone)]
struct CoreSlot {
    available: bool,
    last_used: Option<DateTime<Utc>>,
    owner: Option<JobId>,
}

/// Bitmap of logical cores with allocate/release operations
#[derive(Debug, Clone)]
pub struct CoreTable {
    slots: Vec<CoreSlot>,
}

impl CoreTable {
    pub fn new(num_cores: usize) -> Self {
        Self {
            slots: vec![
                CoreSlot {
                    available: true,
                    last_used: None,
                    owner: None,
                };
                num_cores
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.slots.iter().filter(|s| s.available).count()
    }

    /// Number of allocated slots
    pub fn allocated(&self) -> usize {
        self.len() - self.available()
    }

    /// Claim the first free slot for `job`. Ties break on lowest index.
    pub fn allocate(&mut self, job: JobId, now: DateTime<Utc>) -> Option<usize> {
        let idx = self.slots.iter().position(|s| s.available)?;
        self.claim(idx, job, now);
        Some(idx)
    }

    /// Claim `count` free slots for `job`, or none at all.
    ///
    /// Partial allocation is not permitted: if fewer than `count` slots are
    /// free the call fails without touching the table.
    pub fn allocate_n(
        &mut self,
        job: JobId,
        count: usize,
        now: DateTime<Utc>,
    ) -> Option<Vec<usize>> {
        let free: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.available)
            .map(|(i, _)| i)
            .take(count)
            .collect();

        if free.len() < count {
            return None;
        }

        for &idx in &free {
            self.claim(idx, job, now);
        }
        Some(free)
    }

    /// Release a slot. Releasing a free or out-of-range slot is a no-op.
    pub fn release(&mut self, core_id: usize) {
        if let Some(slot) = self.slots.get_mut(core_id) {
            slot.available = true;
            slot.owner = None;
        }
    }

    pub fn release_all(&mut self, core_ids: &[usize]) {
        for &core_id in core_ids {
            self.release(core_id);
        }
    }

    /// The job currently holding a slot, if any
    pub fn owner(&self, core_id: usize) -> Option<JobId> {
        self.slots.get(core_id).and_then(|s| s.owner)
    }

    /// When the slot was last handed out
    pub fn last_used(&self, core_id: usize) -> Option<DateTime<Utc>> {
        self.slots.get(core_id).and_then(|s| s.last_used)
    }

    fn claim(&mut self, idx: usize, job: JobId, now: DateTime<Utc>) {
        let slot = &mut self.slots[idx];
        slot.available = false;
        slot.last_used = Some(now);
        slot.owner = Some(job);
    }
}

#[cfg(test)]
#[path = "cores_tests.rs"]
mod tests;
