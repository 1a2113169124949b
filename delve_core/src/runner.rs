//! # Secure Runner
//!
//! One object that owns the whole pipeline: validate the command line, resolve
//! the working directory and every path operand inside the sandbox, execute
//! within budgets. Every failure comes back as a [`RunError`] that maps onto a
//! [`FailureClass`].

use crate::builders::CommandLine;
use crate::classifier::{ambiguous_operands, looks_like_path, path_operands};
use crate::config::SecurityConfig;
use crate::error::{FailureClass, Rejection};
use crate::executor::{ExecError, ExecResult, ExecutionLimits, Executor, TerminationReason};
use crate::policy::{AllowedCommand, PolicyTable};
use crate::sandbox::{Sandbox, SandboxError, SandboxedPath};
use crate::validator::{ArgumentLimits, CommandValidator, ValidatedCommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Any failure of [`SecureRunner::run`].
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Command rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Path rejected: {0}")]
    Path(#[from] SandboxError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The process was killed; `partial` holds what it produced first.
    #[error("Process killed: {}", describe(.reason))]
    Terminated {
        reason: TerminationReason,
        partial: ExecResult,
    },
}

fn describe(reason: &TerminationReason) -> &'static str {
    match reason {
        TerminationReason::Timeout => "execution timed out",
        TerminationReason::OutputLimit => "output limit exceeded",
    }
}

impl RunError {
    pub fn class(&self) -> FailureClass {
        match self {
            RunError::Rejected(rejection) => rejection.class(),
            RunError::Path(e) => e.class(),
            RunError::Exec(e) => e.class(),
            RunError::Terminated { reason, .. } => reason.class(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// Validator, sandbox and executor wired together.
#[derive(Debug, Clone)]
pub struct SecureRunner {
    sandbox: Arc<Sandbox>,
    validator: CommandValidator,
    executor: Executor,
    limits: ExecutionLimits,
}

impl SecureRunner {
    pub fn new(policies: Arc<PolicyTable>, sandbox: Arc<Sandbox>) -> Self {
        Self {
            validator: CommandValidator::new(policies),
            executor: Executor::new(Arc::clone(&sandbox)),
            sandbox,
            limits: ExecutionLimits::default(),
        }
    }

    /// Build a runner from configuration. `extra_roots` are added to the
    /// configured sandbox roots.
    pub fn from_config(
        config: &SecurityConfig,
        extra_roots: &[PathBuf],
    ) -> Result<Self, SandboxError> {
        let mut roots = config.sandbox_roots.clone();
        roots.extend_from_slice(extra_roots);
        let sandbox = Sandbox::new(roots)?;

        Ok(
            Self::new(Arc::new(config.policy_table()), Arc::new(sandbox))
                .with_limits(config.limits)
                .with_argument_limits(config.argument_limits),
        )
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_argument_limits(mut self, limits: ArgumentLimits) -> Self {
        self.validator = self.validator.with_limits(limits);
        self
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Validate and execute `line`. `working_dir` defaults to the primary root,
    /// `limits` to the runner's defaults.
    pub async fn run(
        &self,
        line: &CommandLine,
        working_dir: Option<&str>,
        limits: Option<ExecutionLimits>,
    ) -> Result<ExecResult, RunError> {
        self.run_args(line.command().name(), line.args(), working_dir, limits)
            .await
    }

    /// Same as [`run`](Self::run) for an unparsed command name.
    pub async fn run_args(
        &self,
        command: &str,
        args: &[String],
        working_dir: Option<&str>,
        limits: Option<ExecutionLimits>,
    ) -> Result<ExecResult, RunError> {
        let checked = self.validator.authorize(command, args)?;
        let dir = working_dir
            .map(|dir| self.sandbox.resolve_working_dir(dir))
            .transpose()?;

        // Path operands are replaced by their resolved form, then the final
        // argument vector is validated again.
        let confined = self.confine_operands(&checked, dir.as_ref().map(SandboxedPath::as_path))?;
        let validated = self.validator.authorize(command, &confined)?;
        let validated = match dir {
            Some(dir) => validated.in_dir(dir.into_path_buf()),
            None => validated,
        };

        let result = self
            .executor
            .execute(&validated, limits.unwrap_or(self.limits))
            .await?;

        match result.termination_reason {
            Some(reason) => {
                warn!(command = %validated.command(), ?reason, "command terminated by limit");
                Err(RunError::Terminated {
                    reason,
                    partial: result,
                })
            }
            None => {
                info!(
                    command = %validated.command(),
                    exit_code = ?result.exit_code,
                    "command completed"
                );
                Ok(result)
            }
        }
    }

    /// Resolve every filesystem operand of `checked` inside the sandbox.
    /// Relative operands are taken relative to `dir` when one is given.
    fn confine_operands(
        &self,
        checked: &ValidatedCommand,
        dir: Option<&Path>,
    ) -> Result<Vec<String>, SandboxError> {
        let policy = self.validator.policies().policy(checked.command());
        let mut args = checked.args().to_vec();
        for index in path_operands(policy, &args) {
            let operand = anchor(&args[index], dir);
            args[index] = self.sandbox.resolve(&operand)?.to_arg();
        }

        // Revisions and package names are left alone; anything that reads as
        // a location is held to the sandbox like any other path.
        let base = dir.unwrap_or_else(|| self.sandbox.primary_root());
        for index in ambiguous_operands(policy, &args) {
            let operand = anchor(&args[index], Some(base));
            let on_disk = checked.command() == AllowedCommand::Git
                && std::fs::symlink_metadata(&operand).is_ok();
            if looks_like_path(&args[index]) || on_disk {
                args[index] = self.sandbox.resolve(&operand)?.to_arg();
            }
        }
        Ok(args)
    }
}

fn anchor(operand: &str, dir: Option<&Path>) -> String {
    match dir {
        Some(dir) if !operand.starts_with('~') && !Path::new(operand).is_absolute() => {
            dir.join(operand).to_string_lossy().into_owned()
        }
        _ => operand.to_string(),
    }
}
