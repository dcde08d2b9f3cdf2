//! External command execution with a timeout

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::trace;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// Run a program to completion and return its stdout.
///
/// The child is killed if it outlives `timeout`.
pub async fn run<P, I, A>(program: P, args: I, timeout: Duration) -> Result<String, CommandError>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let name = program.as_ref().to_string_lossy().into_owned();

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    trace!(program = %name, "Running command");

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| CommandError::TimedOut {
            program: name.clone(),
            timeout,
        })?
        .map_err(|source| CommandError::Spawn {
            program: name.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: name,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
