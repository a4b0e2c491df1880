// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-text heuristics for runtime estimation and simulated metrics
//!
//! The scheduler never measures the child process; it derives an estimated
//! runtime and a set of synthetic metrics from the command string alone.
//! Keyword matching is case-insensitive.

use crate::job::ResourceLimits;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static SLEEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sleep\s+(\d+)").expect("constant regex pattern is valid"));

/// Estimate how long a command will run, in seconds.
///
/// `sleep <N>` is taken literally; other commands start from a 5 s base
/// scaled by keyword class, plus a length term.
pub fn estimated_runtime_secs(command: &str) -> u64 {
    let cmd = command.to_lowercase();

    if cmd.contains("sleep") {
        if let Some(caps) = SLEEP_RE.captures(&cmd) {
            if let Ok(secs) = caps[1].parse() {
                return secs;
            }
        }
        return 10;
    }

    let mut base: u64 = 5;

    if cmd.contains("for") || cmd.contains("while") {
        base *= 3;
    }
    if cmd.contains("find") || cmd.contains("grep") {
        base *= 2;
    }
    if cmd.contains("make") || cmd.contains("compile") {
        base *= 5;
    }
    if cmd.contains("download") || cmd.contains("wget") || cmd.contains("curl") {
        base *= 4;
    }

    base + command.len() as u64 / 20
}

/// Synthetic resource metrics stamped on a job at dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedMetrics {
    pub cpu_utilization: f64,
    pub memory_usage_mb: u64,
    pub context_switches: u32,
}

/// Derive simulated CPU, memory and context-switch figures for a command.
///
/// Memory is clamped to the job's declared `max_memory_mb`.
pub fn simulate_metrics(command: &str, limits: &ResourceLimits) -> SimulatedMetrics {
    let mut rng = rand::thread_rng();
    let cmd = command.to_lowercase();

    let cpu_utilization = if cmd.contains("sleep") {
        5.0 + f64::from(rng.gen_range(0..15))
    } else if cmd.contains("find") || cmd.contains("grep") {
        30.0 + f64::from(rng.gen_range(0..40))
    } else if cmd.contains("make") || cmd.contains("compile") {
        70.0 + f64::from(rng.gen_range(0..30))
    } else {
        25.0 + f64::from(rng.gen_range(0..50))
    };

    let mut memory_usage_mb = 10 + command.len() as u64 / 10;
    if cmd.contains("make") {
        memory_usage_mb *= 5;
    }

    SimulatedMetrics {
        cpu_utilization,
        memory_usage_mb: memory_usage_mb.min(limits.max_memory_mb),
        context_switches: 100 + rng.gen_range(0..500),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        sleep_literal = { "sleep 42", 42 },
        sleep_no_arg = { "sleep", 10 },
        sleep_bad_arg = { "sleep forever", 10 },
        plain_echo = { "echo hi", 5 },
        loop_keyword = { "for i in 1 2 3; do echo $i; done", 15 + 31 / 20 },
        build_keyword = { "make all", 25 },
        network_keyword = { "wget http://a.example/f", 20 + 23 / 20 },
    )]
    fn estimates_from_command_text(command: &str, expected: u64) {
        assert_eq!(estimated_runtime_secs(command), expected);
    }

    #[test]
    fn keyword_classes_compound() {
        // grep inside a while loop: 5 * 3 * 2 plus the length term
        let cmd = "while true; do grep x f; done";
        assert_eq!(estimated_runtime_secs(cmd), 30 + cmd.len() as u64 / 20);
    }

    #[test]
    fn longer_commands_estimate_higher() {
        let short = estimated_runtime_secs("echo x");
        let long = estimated_runtime_secs(&format!("echo {}", "x".repeat(200)));
        assert!(long > short);
    }

    #[test]
    fn sleep_match_is_case_insensitive() {
        assert_eq!(estimated_runtime_secs("SLEEP 7"), 7);
    }

    #[test]
    fn simulated_cpu_stays_in_band() {
        let limits = ResourceLimits::default();
        for _ in 0..50 {
            let m = simulate_metrics("sleep 5", &limits);
            assert!((5.0..20.0).contains(&m.cpu_utilization));
            let m = simulate_metrics("make -j4", &limits);
            assert!((70.0..100.0).contains(&m.cpu_utilization));
        }
    }

    #[test]
    fn simulated_memory_respects_declared_limit() {
        let limits = ResourceLimits {
            max_memory_mb: 16,
            ..ResourceLimits::default()
        };
        let m = simulate_metrics(&format!("make {}", "x".repeat(500)), &limits);
        assert_eq!(m.memory_usage_mb, 16);
    }

    #[test]
    fn context_switches_in_band() {
        let limits = ResourceLimits::default();
        for _ in 0..50 {
            let m = simulate_metrics("echo hi", &limits);
            assert!((100..600).contains(&m.context_switches));
        }
    }
}
