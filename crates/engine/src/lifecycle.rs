// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process spawn and reap
//!
//! Each job runs as `/bin/sh -c <command>`. The spawn is fork-then-exec
//! with no intervening work, which keeps it safe in a multi-threaded
//! parent. The wait blocks the calling worker thread; the scheduler lock
//! is never held across it.

use std::io;
use std::process::{Child, Command};

/// How a reaped child finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, or -1 for abnormal termination
    pub exit_code: i32,
    /// True when the child exited normally (even with a nonzero code)
    pub clean: bool,
}

impl ExitOutcome {
    pub fn succeeded(&self) -> bool {
        self.clean && self.exit_code == 0
    }
}

/// Start a shell child for the given command line
pub fn spawn_shell(command: &str) -> io::Result<Child> {
    Command::new("/bin/sh").arg("-c").arg(command).spawn()
}

/// Block until the child exits and map its status
pub fn wait_child(child: &mut Child) -> io::Result<ExitOutcome> {
    let status = child.wait()?;
    Ok(match status.code() {
        Some(code) => ExitOutcome {
            exit_code: code,
            clean: true,
        },
        // Terminated by a signal
        None => ExitOutcome {
            exit_code: -1,
            clean: false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_exits_zero() {
        let mut child = spawn_shell("true").unwrap();
        let outcome = wait_child(&mut child).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn false_exits_nonzero() {
        let mut child = spawn_shell("false").unwrap();
        let outcome = wait_child(&mut child).unwrap();
        assert!(outcome.clean);
        assert_eq!(outcome.exit_code, 1);
        assert!(!outcome.succeeded());
    }

    #[test]
    fn exit_code_is_preserved() {
        let mut child = spawn_shell("exit 42").unwrap();
        let outcome = wait_child(&mut child).unwrap();
        assert_eq!(outcome.exit_code, 42);
    }

    #[test]
    fn signalled_child_reports_abnormal_exit() {
        let mut child = spawn_shell("kill -TERM $$; sleep 10").unwrap();
        let outcome = wait_child(&mut child).unwrap();
        assert!(!outcome.clean);
        assert_eq!(outcome.exit_code, -1);
    }

    #[test]
    fn shell_resolves_commands_with_arguments() {
        let mut child = spawn_shell("test 1 -lt 2").unwrap();
        let outcome = wait_child(&mut child).unwrap();
        assert!(outcome.succeeded());
    }
}
