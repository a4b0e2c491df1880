// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-script parsing
//!
//! A job script is a line-oriented text file: lines beginning with `#` are
//! headers of the form `# KEY: value`, and the first non-header non-blank
//! line is the command. Header keys are case-sensitive; values are trimmed.

use crate::job::{JobId, JobPriority, ResourceLimits};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or parsing a job script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to open job script {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("no command found in job script")]
    MissingCommand,
    #[error("invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// A fully parsed job script, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    pub name: Option<String>,
    pub priority: JobPriority,
    pub limits: ResourceLimits,
    pub dependencies: Vec<JobId>,
    pub command: String,
}

/// Read and parse a job script from disk
pub fn load_script(path: &Path) -> Result<JobScript, ScriptError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Open {
        path: path.display().to_string(),
        source,
    })?;
    parse_script(&content)
}

/// Parse job-script content
pub fn parse_script(content: &str) -> Result<JobScript, ScriptError> {
    let mut name = None;
    let mut priority = JobPriority::Medium;
    let mut limits = ResourceLimits::default();
    let mut dependencies = Vec::new();
    let mut command = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(header) = trimmed.strip_prefix('#') else {
            command = Some(trimmed.to_string());
            break;
        };

        let Some((key, value)) = header.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "JOB_NAME" => {
                if !value.is_empty() {
                    name = Some(value.to_string());
                }
            }
            "PRIORITY" => {
                priority = value.parse().map_err(|_| ScriptError::InvalidField {
                    field: "PRIORITY",
                    value: value.to_string(),
                })?;
            }
            "MEMORY_LIMIT" => {
                limits.max_memory_mb = parse_number("MEMORY_LIMIT", value)?;
            }
            "RUNTIME_LIMIT" => {
                limits.max_runtime_secs = parse_number("RUNTIME_LIMIT", value)?;
            }
            "CORES" => {
                let cores: u32 = parse_number("CORES", value)? as u32;
                if cores == 0 {
                    return Err(ScriptError::InvalidField {
                        field: "CORES",
                        value: value.to_string(),
                    });
                }
                limits.max_cpu_cores = cores;
            }
            "DEPENDENCIES" => {
                for part in value.split(',') {
                    let id = part.trim().parse().map_err(|_| ScriptError::InvalidField {
                        field: "DEPENDENCIES",
                        value: part.trim().to_string(),
                    })?;
                    dependencies.push(id);
                }
            }
            // Unknown headers are ignored
            _ => {}
        }
    }

    let command = command.ok_or(ScriptError::MissingCommand)?;

    Ok(JobScript {
        name,
        priority,
        limits,
        dependencies,
        command,
    })
}

fn parse_number(field: &'static str, value: &str) -> Result<u64, ScriptError> {
    value.parse().map_err(|_| ScriptError::InvalidField {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
