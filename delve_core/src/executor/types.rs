use crate::error::FailureClass;
use crate::sandbox::SandboxError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Wall-clock and output budgets for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionLimits {
    /// Milliseconds before the process is killed.
    pub timeout_ms: u32,
    /// Combined stdout and stderr bytes before the process is killed.
    pub max_output_bytes: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_output_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ExecutionLimits {
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: u32) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    pub fn output_budget(&self) -> usize {
        usize::try_from(self.max_output_bytes).unwrap_or(usize::MAX)
    }
}

/// Why the executor killed a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Timeout,
    OutputLimit,
}

impl TerminationReason {
    pub fn class(self) -> FailureClass {
        match self {
            TerminationReason::Timeout => FailureClass::ExecutionTimeout,
            TerminationReason::OutputLimit => FailureClass::OutputLimitExceeded,
        }
    }
}

/// Captured result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// `None` when the process was killed or ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    pub termination_reason: Option<TerminationReason>,
    pub duration: Duration,
}

impl ExecResult {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn output_len(&self) -> usize {
        self.stdout.len() + self.stderr.len()
    }

    /// Failure class when the executor killed the process.
    pub fn failure_class(&self) -> Option<FailureClass> {
        self.termination_reason.map(TerminationReason::class)
    }
}

/// Errors that prevent an execution from producing an [`ExecResult`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to start '{program:?}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Working directory rejected: {0}")]
    WorkingDir(#[from] SandboxError),

    /// Reading a pipe or waiting for exit failed after a successful spawn.
    #[error("Failed while supervising the process: {0}")]
    Io(#[source] std::io::Error),
}

impl ExecError {
    /// `Io` has no class of its own: like a failed spawn it is a host-level
    /// fault unrelated to the command line, so both report `SpawnFailure`.
    /// Match on the variant to tell them apart.
    pub fn class(&self) -> FailureClass {
        match self {
            ExecError::Spawn { .. } | ExecError::Io(_) => FailureClass::SpawnFailure,
            ExecError::WorkingDir(e) => e.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervision_failures_are_host_level() {
        let io = ExecError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(io.class(), FailureClass::SpawnFailure);
        assert!(!io.class().is_retryable());
        assert!(io.to_string().starts_with("Failed while supervising"));

        let cwd = ExecError::from(SandboxError::MissingWorkingDir {
            path: PathBuf::from("/sandbox/not-yet"),
        });
        assert_eq!(cwd.class(), FailureClass::PathRejected);
    }
}
