//! Failure taxonomy shared by the validators and the executor.
//!
//! Every failure this crate produces maps onto one [`FailureClass`]. Callers use
//! the class to decide how to report the failure and whether narrowing the input
//! and retrying makes sense; only timeouts and output-limit kills are retryable.

use std::fmt;

/// Coarse classification of every failure the security layer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Unallowlisted or disabled command, disallowed flag, operator or subcommand.
    PolicyViolation,
    /// An argument matched a dangerous-content rule.
    ContentRejected,
    /// A path resolved outside every sandbox root.
    PathRejected,
    /// The process was killed after exceeding its wall-clock budget.
    ExecutionTimeout,
    /// The process was killed after exceeding its output budget.
    OutputLimitExceeded,
    /// Environment-level failure: the allowlisted binary could not be started,
    /// or the host lost the child's pipes or exit status while supervising it.
    SpawnFailure,
}

impl FailureClass {
    /// Whether retrying with a narrower query can succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureClass::ExecutionTimeout | FailureClass::OutputLimitExceeded
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::PolicyViolation => "policy_violation",
            FailureClass::ContentRejected => "content_rejected",
            FailureClass::PathRejected => "path_rejected",
            FailureClass::ExecutionTimeout => "execution_timeout",
            FailureClass::OutputLimitExceeded => "output_limit_exceeded",
            FailureClass::SpawnFailure => "spawn_failure",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specific check that rejected a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    UnknownCommand,
    CommandDisabled,
    DisallowedOperator,
    DisallowedSubcommand,
    DisallowedFlag,
    MissingFlagValue,
    ArgumentLimit,
    DangerousContent,
}

impl RejectionKind {
    pub fn class(self) -> FailureClass {
        match self {
            RejectionKind::DangerousContent => FailureClass::ContentRejected,
            _ => FailureClass::PolicyViolation,
        }
    }
}

/// Why a command line was refused. Messages never contain a rejected value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn class(&self) -> FailureClass {
        self.kind.class()
    }
}

/// Render an untrusted token for a diagnostic: control characters escaped and
/// the result bounded in length.
pub(crate) fn preview(token: &str) -> String {
    const MAX_PREVIEW_CHARS: usize = 32;

    let escaped: String = token.escape_debug().collect();
    if escaped.chars().count() > MAX_PREVIEW_CHARS {
        let head: String = escaped.chars().take(MAX_PREVIEW_CHARS).collect();
        format!("{head}…")
    } else {
        escaped
    }
}
