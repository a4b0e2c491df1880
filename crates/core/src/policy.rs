// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling policy selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the next job is chosen from the ready set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulingPolicy {
    /// Argmax of the dynamic priority score
    #[default]
    PriorityFirst,
    /// Argmin of the estimated runtime
    ShortestJobFirst,
    /// FIFO within the highest occupied priority level
    RoundRobin,
    /// Prefer the job whose array group has consumed the least CPU time
    FairShare,
}

impl SchedulingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingPolicy::PriorityFirst => "PRIORITY_FIRST",
            SchedulingPolicy::ShortestJobFirst => "SHORTEST_JOB_FIRST",
            SchedulingPolicy::RoundRobin => "ROUND_ROBIN",
            SchedulingPolicy::FairShare => "FAIR_SHARE",
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" | "priority_first" => Ok(SchedulingPolicy::PriorityFirst),
            "sjf" | "shortest" | "shortest_job_first" => Ok(SchedulingPolicy::ShortestJobFirst),
            "rr" | "round_robin" => Ok(SchedulingPolicy::RoundRobin),
            "fair" | "fair_share" => Ok(SchedulingPolicy::FairShare),
            other => Err(format!("unknown scheduling policy: {}", other)),
        }
    }
}
