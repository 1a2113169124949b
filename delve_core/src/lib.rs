//! # Delve Core
//!
//! The command security and sandboxed execution layer behind Delve's filesystem
//! search and inspection tools. The tools shell out to a handful of
//! command-line programs (`rg`, `grep`, `find`, `ls`, `git`, `npm`) with
//! argument values chosen by an automated agent, so every value is treated as
//! hostile until proven otherwise.
//!
//! ## Pipeline
//!
//! 1. **`builders`** (optional): typed query builders whose path slots only
//!    accept paths that already passed the sandbox.
//! 2. **`classifier`**: labels each argument with its role (path, pattern,
//!    flag, flag value, structural) for the command that will receive it.
//! 3. **`scanner`**: checks each argument against the strict or the
//!    pattern-permissive dangerous-content rule set, chosen by its role.
//! 4. **`validator`**: the allowlist gate. Command, locator operators,
//!    subcommand, flags, limits and content are checked in that order; only a
//!    passing command line becomes a `ValidatedCommand`.
//! 5. **`sandbox`**: symlink-safe containment of paths and working directories
//!    inside the configured roots.
//! 6. **`executor`**: runs a `ValidatedCommand` without a shell, with a rebuilt
//!    environment, under a wall-clock deadline and an output budget.
//!
//! **`runner::SecureRunner`** wires all of the above together, and
//! **`config`** describes a deployment. Every failure maps onto one
//! [`error::FailureClass`].

pub mod builders;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod policy;
pub mod runner;
pub mod sandbox;
pub mod scanner;
pub mod shell;
pub mod utils;
pub mod validator;

pub use builders::CommandLine;
pub use config::SecurityConfig;
pub use error::{FailureClass, Rejection, RejectionKind};
pub use executor::{ExecError, ExecResult, ExecutionLimits, Executor, TerminationReason};
pub use policy::{AllowedCommand, PolicyTable};
pub use runner::{RunError, SecureRunner};
pub use sandbox::{PathValidation, Sandbox, SandboxError, SandboxedPath};
pub use validator::{CommandValidator, ValidatedCommand, ValidationOutcome};
