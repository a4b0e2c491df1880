// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler runtime

use thiserror::Error;

/// Errors surfaced by the scheduler control API
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job script error: {0}")]
    Script(#[from] jsh_core::ScriptError),
}
