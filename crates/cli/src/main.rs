//! jsh - interactive job-scheduling shell
//!
//! A thin front-end over the jsh-engine scheduler: parses startup flags,
//! opens the audit log, and hands the terminal to the REPL.

use anyhow::Context;
use clap::Parser;
use jsh_core::SchedulingPolicy;
use jsh_engine::{CsvEventLog, JobScheduler};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

mod output;
mod shell;

#[derive(Parser)]
#[command(name = "jsh")]
#[command(about = "jsh - multi-threaded job-scheduling shell")]
#[command(version)]
struct Cli {
    /// Worker pool size (defaults to the detected logical CPU count)
    #[arg(long)]
    cores: Option<usize>,

    /// Cap on concurrently running jobs (defaults to 2 x cores)
    #[arg(long)]
    max_jobs: Option<usize>,

    /// Audit log path
    #[arg(long, default_value = CsvEventLog::DEFAULT_PATH)]
    log: PathBuf,

    /// Initial scheduling policy (priority, sjf, round_robin, fair)
    #[arg(long, default_value = "priority")]
    policy: SchedulingPolicy,

    /// Output format (text or json)
    #[arg(long, value_enum, default_value = "text")]
    format: output::OutputFormat,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Logger-init failure is fatal; everything downstream depends on it
    let sink = Arc::new(
        CsvEventLog::create(&cli.log)
            .with_context(|| format!("failed to initialize audit log at {}", cli.log.display()))?,
    );

    let scheduler = match cli.cores {
        Some(cores) => JobScheduler::new(cores, sink),
        None => JobScheduler::with_detected_cores(sink),
    };
    if let Some(max_jobs) = cli.max_jobs {
        scheduler.set_max_concurrent_jobs(max_jobs);
    }
    scheduler.set_scheduling_policy(cli.policy);
    scheduler.start();

    let shell = shell::Shell::new(scheduler, cli.format);
    let stdin = io::stdin();
    shell.run(stdin.lock(), io::stdout())?;

    shell.shutdown();
    Ok(())
}
