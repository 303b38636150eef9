//! External process execution with a hard timeout.
//!
//! Every helper, tmux and ssh invocation goes through [`run`]. The child is
//! spawned with `kill_on_drop`, so when the timeout fires and the future is
//! dropped the process is killed rather than left running.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::FocusError;

/// Captured result of a process that ran to completion.
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stderr, or stdout when stderr is empty. Used as failure detail.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run `program` with `args`, waiting at most `timeout`.
///
/// Spawn failures and timeouts are errors; a non-zero exit is returned as a
/// normal [`ProcessOutput`] so callers can classify it.
pub async fn run<I, S>(program: &str, args: I, timeout: Duration) -> Result<ProcessOutput, FocusError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| FocusError::SpawnFailure {
            program: program.to_string(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(FocusError::SpawnFailure {
                program: program.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(FocusError::ProcessTimeout {
                program: program.to_string(),
                timeout,
            })
        }
    };

    let result = ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    debug!(
        component = "process",
        event = "process.exited",
        program = program,
        exit_code = ?result.exit_code,
        duration_ms = result.duration_ms,
    );

    Ok(result)
}

/// Like [`run`], but a non-zero exit becomes [`FocusError::NonZeroExit`].
pub async fn run_checked<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<ProcessOutput, FocusError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run(program, args, timeout).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(FocusError::NonZeroExit {
            program: program.to_string(),
            code: output.exit_code,
            detail: output.diagnostic(),
        })
    }
}
