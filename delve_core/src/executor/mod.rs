//! # Sandboxed Executor
//!
//! Runs a [`ValidatedCommand`] and nothing else. The program is spawned
//! directly with discrete argv elements (never through a shell), with stdin
//! closed, a cleared and rebuilt environment, and `kill_on_drop` so dropping
//! the future also kills the child.
//!
//! While the child runs, its exit is raced against a wall-clock deadline and a
//! combined stdout + stderr budget. Whichever limit trips first kills the
//! process and is reported as the `termination_reason`; the buffers handed back
//! are cut to the budget.
//!
//! The working directory is resolved through the sandbox again immediately
//! before spawning, so a directory that moved after validation is refused, and
//! one that does not exist yet is a path rejection rather than a spawn failure.

mod env;
mod types;

pub use env::{ENV_ALLOWLIST, child_environment, hardening};
pub use types::{ExecError, ExecResult, ExecutionLimits, TerminationReason};

use crate::sandbox::{Sandbox, SandboxError};
use crate::validator::ValidatedCommand;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

const READ_CHUNK: usize = 8 * 1024;

/// Spawns validated commands inside a sandbox.
#[derive(Debug, Clone)]
pub struct Executor {
    sandbox: Arc<Sandbox>,
}

impl Executor {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Execute `command` within `limits`.
    pub async fn execute(
        &self,
        command: &ValidatedCommand,
        limits: ExecutionLimits,
    ) -> Result<ExecResult, ExecError> {
        let working_dir = match command.working_dir() {
            Some(dir) => self.sandbox.resolve_working_dir(&dir.to_string_lossy())?,
            None => self.sandbox.resolve_working_dir(&self.sandbox.primary_root().to_string_lossy())?,
        };
        // Validation accepts a directory that is yet to be created; the child cannot start in one.
        if !working_dir.as_path().is_dir() {
            return Err(SandboxError::MissingWorkingDir {
                path: working_dir.into_path_buf(),
            }
            .into());
        }

        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .current_dir(working_dir.as_path())
            .env_clear()
            .envs(child_environment(command.command(), std::env::vars()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            command = %command.command(),
            program = %command.program().display(),
            args = command.args().len(),
            cwd = %working_dir,
            timeout_ms = limits.timeout_ms,
            max_output_bytes = limits.max_output_bytes,
            "spawning process"
        );

        let started = Instant::now();
        let child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: command.program().to_path_buf(),
            source,
        })?;

        let result = collect(child, limits, started).await?;

        match result.termination_reason {
            Some(reason) => tracing::warn!(
                command = %command.command(),
                ?reason,
                elapsed_ms = result.duration.as_millis() as u64,
                "process killed"
            ),
            None => tracing::debug!(
                command = %command.command(),
                exit_code = ?result.exit_code,
                output_bytes = result.output_len(),
                elapsed_ms = result.duration.as_millis() as u64,
                "process finished"
            ),
        }
        Ok(result)
    }
}

/// Drain both pipes and wait for exit, or kill the child when a limit trips.
async fn collect(
    mut child: Child,
    limits: ExecutionLimits,
    started: Instant,
) -> Result<ExecResult, ExecError> {
    let budget = limits.output_budget();
    let deadline = tokio::time::sleep(limits.timeout());
    tokio::pin!(deadline);

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut out_chunk = vec![0u8; READ_CHUNK];
    let mut err_chunk = vec![0u8; READ_CHUNK];

    let mut termination_reason = None;

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            _ = &mut deadline => {
                termination_reason = Some(TerminationReason::Timeout);
                break;
            }
            read = read_some(&mut stdout, &mut out_chunk) => {
                append(read, &mut stdout, &out_chunk, &mut out)?;
            }
            read = read_some(&mut stderr, &mut err_chunk) => {
                append(read, &mut stderr, &err_chunk, &mut err)?;
            }
        }
        if out.len() + err.len() > budget {
            termination_reason = Some(TerminationReason::OutputLimit);
            break;
        }
    }

    let exit_code = match termination_reason {
        Some(_) => {
            kill(&mut child).await;
            None
        }
        None => {
            tokio::select! {
                _ = &mut deadline => {
                    termination_reason = Some(TerminationReason::Timeout);
                    kill(&mut child).await;
                    None
                }
                status = child.wait() => status.map_err(ExecError::Io)?.code(),
            }
        }
    };

    truncate_to_budget(&mut out, &mut err, budget);

    Ok(ExecResult {
        success: termination_reason.is_none() && exit_code == Some(0),
        exit_code,
        stdout: out,
        stderr: err,
        termination_reason,
        duration: started.elapsed(),
    })
}

/// Read from a pipe that is still open. A closed pipe never completes, so the
/// other `select!` branches keep running.
async fn read_some<R>(pipe: &mut Option<R>, chunk: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(chunk).await,
        None => std::future::pending().await,
    }
}

fn append<R>(
    read: std::io::Result<usize>,
    pipe: &mut Option<R>,
    chunk: &[u8],
    buffer: &mut Vec<u8>,
) -> Result<(), ExecError> {
    match read.map_err(ExecError::Io)? {
        0 => *pipe = None,
        n => buffer.extend_from_slice(&chunk[..n]),
    }
    Ok(())
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("failed to kill child process: {e}");
    }
}

/// Keep at most `budget` bytes in total, stdout first.
fn truncate_to_budget(out: &mut Vec<u8>, err: &mut Vec<u8>, budget: usize) {
    out.truncate(budget);
    err.truncate(budget - out.len());
}
