// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text and JSON rendering of scheduler snapshots
//!
//! The scheduler emits no terminal escapes; everything here is plain text
//! so output pipes cleanly.

use jsh_core::JobRecord;
use jsh_engine::SystemStats;
use std::io::{self, Write};

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render_jobs<W: Write>(
    out: &mut W,
    format: OutputFormat,
    jobs: &[JobRecord],
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(jobs).unwrap_or_default();
            writeln!(out, "{}", json)
        }
        OutputFormat::Text => {
            if jobs.is_empty() {
                return writeln!(out, "no jobs");
            }
            writeln!(
                out,
                "{:>5}  {:<12}  {:<12}  {:<8}  {:>4}  {:>6}  command",
                "id", "name", "status", "priority", "core", "exit"
            )?;
            for job in jobs {
                writeln!(
                    out,
                    "{:>5}  {:<12}  {:<12}  {:<8}  {:>4}  {:>6}  {}",
                    job.id.to_string(),
                    job.name.as_deref().unwrap_or("-"),
                    job.status.to_string(),
                    job.priority.to_string(),
                    job.assigned_core
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".into()),
                    job.exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".into()),
                    job.command,
                )?;
            }
            Ok(())
        }
    }
}

pub fn render_job<W: Write>(out: &mut W, format: OutputFormat, job: &JobRecord) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(job).unwrap_or_default();
            writeln!(out, "{}", json)
        }
        OutputFormat::Text => {
            writeln!(out, "Job {}", job.id)?;
            if let Some(name) = &job.name {
                writeln!(out, "  name:       {}", name)?;
            }
            writeln!(out, "  command:    {}", job.command)?;
            writeln!(out, "  status:     {}", job.status)?;
            writeln!(out, "  priority:   {}", job.priority)?;
            writeln!(out, "  type:       {:?}", job.job_type)?;
            writeln!(out, "  submitted:  {}", job.submit_time)?;
            if let Some(start) = job.start_time {
                writeln!(out, "  started:    {}", start)?;
            }
            if let Some(end) = job.end_time {
                writeln!(out, "  ended:      {}", end)?;
                writeln!(out, "  runtime:    {} ms", job.actual_runtime_ms)?;
            }
            if let Some(pid) = job.process_id {
                writeln!(out, "  pid:        {}", pid)?;
            }
            if let Some(exit) = job.exit_code {
                writeln!(out, "  exit code:  {}", exit)?;
            }
            if !job.dependencies.is_empty() {
                let mut deps: Vec<String> =
                    job.dependencies.iter().map(|d| d.to_string()).collect();
                deps.sort();
                writeln!(out, "  depends on: {}", deps.join(", "))?;
            }
            Ok(())
        }
    }
}

pub fn render_stats<W: Write>(
    out: &mut W,
    format: OutputFormat,
    stats: &SystemStats,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(stats).unwrap_or_default();
            writeln!(out, "{}", json)
        }
        OutputFormat::Text => {
            writeln!(out, "System statistics")?;
            writeln!(out, "  submitted:        {}", stats.total_jobs_submitted)?;
            writeln!(out, "  completed:        {}", stats.total_jobs_completed)?;
            writeln!(out, "  failed:           {}", stats.total_jobs_failed)?;
            writeln!(out, "  killed:           {}", stats.total_jobs_killed)?;
            writeln!(out, "  avg turnaround:   {:.1} ms", stats.average_turnaround_ms)?;
            writeln!(out, "  avg wait:         {:.1} ms", stats.average_wait_ms)?;
            writeln!(out, "  throughput:       {:.2} jobs/min", stats.system_throughput)?;
            writeln!(out, "  running memory:   {} MB", stats.current_memory_usage_mb)?;
            writeln!(out, "  up since:         {}", stats.start_time)?;
            Ok(())
        }
    }
}

pub fn render_cores<W: Write>(
    out: &mut W,
    format: OutputFormat,
    utilization: &[u32],
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(utilization).unwrap_or_default();
            writeln!(out, "{}", json)
        }
        OutputFormat::Text => {
            for (core, pct) in utilization.iter().enumerate() {
                writeln!(out, "core {:>3}: {:>3}%", core, pct)?;
            }
            Ok(())
        }
    }
}
