// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented shell front-end
//!
//! Reads commands from stdin, dispatches builtins to the scheduler control
//! API, and submits any other non-empty line as a job. Rendering stays in
//! `output`; the scheduler itself emits nothing to the terminal.

use crate::output::{self, OutputFormat};
use jsh_core::{JobId, JobPriority, SchedulingPolicy};
use jsh_engine::JobScheduler;
use std::io::{self, BufRead, Write};

const HELP: &str = "\
Commands:
  <command line>          submit the line as a job (MEDIUM priority)
  submit <path>           submit a job-script file
  array <size> <template> submit an array job ($ARRAY_ID is the task index)
  jobs [all|active|completed]
  status <id>             show one job in full
  kill <id>               kill a running job
  suspend <id>            suspend a running job (SIGSTOP)
  resume <id>             resume a suspended job (SIGCONT)
  priority <id> <level>   re-prioritize a pending job
  queue                   show ready-queue length
  stats                   show system statistics
  cores                   show per-core utilization
  policy <name>           set scheduling policy (priority|sjf|round_robin|fair)
  maxjobs <n>             cap concurrently running jobs
  affinity <on|off>       record the CPU-affinity flag
  help                    show this help
  exit                    quit";

pub struct Shell {
    scheduler: JobScheduler,
    format: OutputFormat,
}

impl Shell {
    pub fn new(scheduler: JobScheduler, format: OutputFormat) -> Self {
        Self { scheduler, format }
    }

    /// Run the REPL until EOF or an exit command
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "jsh {} ({} cores). Type 'help' for commands.",
            env!("CARGO_PKG_VERSION"),
            self.scheduler.num_cores()
        )?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !self.dispatch(line, &mut out)? {
                break;
            }
        }
        Ok(())
    }

    /// Stop the scheduler; called once the REPL has returned
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }

    /// Handle one input line; false means exit
    fn dispatch<W: Write>(&self, line: &str, out: &mut W) -> io::Result<bool> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim()),
            None => (line, ""),
        };

        match command {
            "exit" | "quit" => return Ok(false),
            "help" => writeln!(out, "{}", HELP)?,

            "jobs" => {
                let jobs = match rest {
                    "active" => self.scheduler.get_active_jobs(),
                    "completed" => self.scheduler.get_completed_jobs(),
                    "" | "all" => self.scheduler.get_jobs(),
                    other => {
                        writeln!(out, "unknown jobs filter: {}", other)?;
                        return Ok(true);
                    }
                };
                output::render_jobs(out, self.format, &jobs)?;
            }

            "status" => match self.parse_id(rest, out)? {
                Some(id) => match self.scheduler.get_job(id) {
                    Some(job) => output::render_job(out, self.format, &job)?,
                    None => writeln!(out, "job {} not found", id)?,
                },
                None => {}
            },

            "submit" => {
                if rest.is_empty() {
                    writeln!(out, "usage: submit <path>")?;
                } else {
                    match self.scheduler.submit_script(std::path::Path::new(rest)) {
                        Ok(job) => writeln!(out, "Submitted job {} from {}", job.id, rest)?,
                        Err(e) => writeln!(out, "submit failed: {}", e)?,
                    }
                }
            }

            "array" => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let size = parts.next().and_then(|s| s.parse::<u32>().ok());
                let template = parts.next().map(str::trim).unwrap_or("");
                match (size, template) {
                    (Some(size), template) if size > 0 && !template.is_empty() => {
                        let tasks =
                            self.scheduler
                                .submit_array(template, size, JobPriority::Medium);
                        writeln!(
                            out,
                            "Submitted array job {} with {} tasks",
                            tasks[0].id,
                            tasks.len()
                        )?;
                    }
                    _ => writeln!(out, "usage: array <size> <template>")?,
                }
            }

            "kill" => self.job_action(rest, out, "killed", |id| self.scheduler.kill(id))?,
            "suspend" => {
                self.job_action(rest, out, "suspended", |id| self.scheduler.suspend(id))?
            }
            "resume" => self.job_action(rest, out, "resumed", |id| self.scheduler.resume(id))?,

            "priority" => {
                let mut parts = rest.split_whitespace();
                let id = parts.next().and_then(|s| s.parse::<JobId>().ok());
                let level = parts.next().and_then(|s| s.parse::<JobPriority>().ok());
                match (id, level) {
                    (Some(id), Some(level)) => {
                        if self.scheduler.change_priority(id, level) {
                            writeln!(out, "Job {} priority set to {}", id, level)?;
                        } else {
                            writeln!(out, "Job {} not found or not pending", id)?;
                        }
                    }
                    _ => writeln!(out, "usage: priority <id> <LOW|MEDIUM|HIGH|CRITICAL>")?,
                }
            }

            "queue" => writeln!(out, "{} job(s) queued", self.scheduler.get_queue_length())?,
            "stats" => {
                output::render_stats(out, self.format, &self.scheduler.get_system_stats())?
            }
            "cores" => {
                output::render_cores(out, self.format, &self.scheduler.get_core_utilization())?
            }

            "policy" => match rest.parse::<SchedulingPolicy>() {
                Ok(policy) => {
                    self.scheduler.set_scheduling_policy(policy);
                    writeln!(out, "Scheduling policy set to {}", policy)?;
                }
                Err(e) => writeln!(out, "{}", e)?,
            },

            "maxjobs" => match rest.parse::<usize>() {
                Ok(max) if max > 0 => {
                    self.scheduler.set_max_concurrent_jobs(max);
                    writeln!(out, "Concurrency cap set to {}", max)?;
                }
                _ => writeln!(out, "usage: maxjobs <n>")?,
            },

            "affinity" => match rest {
                "on" => {
                    self.scheduler.enable_cpu_affinity(true);
                    writeln!(out, "CPU affinity flag enabled")?;
                }
                "off" => {
                    self.scheduler.enable_cpu_affinity(false);
                    writeln!(out, "CPU affinity flag disabled")?;
                }
                _ => writeln!(out, "usage: affinity <on|off>")?,
            },

            // Anything else is a job submission
            _ => {
                let job = self.scheduler.submit(line, JobPriority::Medium);
                writeln!(out, "Submitted job {}", job.id)?;
            }
        }

        Ok(true)
    }

    fn parse_id<W: Write>(&self, rest: &str, out: &mut W) -> io::Result<Option<JobId>> {
        match rest.parse::<JobId>() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                writeln!(out, "expected a job id, got '{}'", rest)?;
                Ok(None)
            }
        }
    }

    fn job_action<W: Write>(
        &self,
        rest: &str,
        out: &mut W,
        verb: &str,
        action: impl Fn(JobId) -> bool,
    ) -> io::Result<()> {
        if let Some(id) = self.parse_id(rest, out)? {
            if action(id) {
                writeln!(out, "Job {} {}", id, verb)?;
            } else {
                writeln!(out, "Job {} not found or not in a valid state", id)?;
            }
        }
        Ok(())
    }
}
