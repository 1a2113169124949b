//! # Delve CLI
//!
//! Command-line front end over the security layer: check a command line, check
//! a path, or validate and run a command inside the sandbox.

use crate::{
    config::SecurityConfig,
    error::FailureClass,
    executor::ExecResult,
    runner::{RunError, SecureRunner},
    utils::logging::init_logging,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

/// Exit code when the process was killed for running too long.
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code when the process was killed for producing too much output.
pub const EXIT_OUTPUT_LIMIT: i32 = 125;
/// Exit code when the command line or a path was rejected.
pub const EXIT_REJECTED: i32 = 126;
/// Exit code when the program could not be started.
pub const EXIT_SPAWN_FAILURE: i32 = 127;

/// Delve: allowlisted, sandboxed execution of search and inspection tools.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "delve validates command lines for a fixed set of read-only tools
(rg, grep, find, ls, git, npm), confines every path to the sandbox roots, and runs
the command without a shell under a time and output budget.

Examples:
   delve check rg -n 'fn main' src
   delve path ../outside --working-dir
   delve --sandbox-root ~/project run --cwd src find . -name '*.rs'"
)]
pub struct Cli {
    /// Path to a security configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Sandbox root directories, added to the configured ones (multiple allowed).
    /// Defaults to the current directory when none are configured.
    #[arg(long = "sandbox-root", global = true)]
    pub sandbox_root: Vec<PathBuf>,

    /// Override the configured execution timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u32>,

    /// Override the configured output budget in bytes
    #[arg(long, global = true)]
    pub max_output_bytes: Option<u32>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log to stderr instead of file
    #[arg(long, global = true)]
    pub log_to_stderr: bool,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Validate a command line without running it
    Check {
        /// Allowlisted command name
        command: String,
        /// Arguments to validate
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        args: Vec<String>,
    },
    /// Resolve a path against the sandbox
    Path {
        /// Candidate path
        candidate: String,
        /// Validate as a working directory
        #[arg(long)]
        working_dir: bool,
    },
    /// Validate and run a command
    Run {
        /// Working directory (defaults to the primary sandbox root)
        #[arg(long)]
        cwd: Option<String>,
        /// Allowlisted command name
        command: String,
        /// Arguments for the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        args: Vec<String>,
    },
}

/// Parse the command line, run the selected mode, and return the exit code.
pub async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    init_logging(log_level, !cli.log_to_stderr)?;

    let config = load_config(&cli)?;
    let problems = config.validate();
    if !problems.is_empty() {
        anyhow::bail!("Invalid security configuration:\n  {}", problems.join("\n  "));
    }

    let mut roots = cli.sandbox_root.clone();
    if config.sandbox_roots.is_empty() && roots.is_empty() {
        roots.push(std::env::current_dir().context("Failed to read current directory")?);
    }
    let runner =
        SecureRunner::from_config(&config, &roots).context("Failed to initialize the sandbox")?;

    tracing::info!(
        roots = ?runner.sandbox().roots(),
        timeout_ms = runner.limits().timeout_ms,
        "delve starting"
    );

    match &cli.mode {
        Mode::Check { command, args } => Ok(check(&runner, command, args, cli.json)),
        Mode::Path {
            candidate,
            working_dir,
        } => Ok(path(&runner, candidate, *working_dir, cli.json)),
        Mode::Run { cwd, command, args } => {
            let outcome = runner
                .run_args(command, args, cwd.as_deref(), None)
                .await;
            report_run(outcome, cli.json)
        }
    }
}

/// Configuration file (or default) with CLI overrides applied.
pub fn load_config(cli: &Cli) -> Result<SecurityConfig> {
    let mut config = SecurityConfig::load_or_default(cli.config.as_deref())?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.limits.timeout_ms = timeout_ms;
    }
    if let Some(max_output_bytes) = cli.max_output_bytes {
        config.limits.max_output_bytes = max_output_bytes;
    }
    Ok(config)
}

fn check(runner: &SecureRunner, command: &str, args: &[String], as_json: bool) -> i32 {
    let outcome = runner.validator().validate(command, args);
    match outcome.rejection() {
        None => {
            if as_json {
                println!("{}", json!({ "valid": true }));
            } else {
                println!("valid");
            }
            0
        }
        Some(rejection) => {
            if as_json {
                println!(
                    "{}",
                    json!({
                        "valid": false,
                        "kind": format!("{:?}", rejection.kind),
                        "class": rejection.class().as_str(),
                        "message": rejection.message,
                    })
                );
            } else {
                println!("rejected ({}): {}", rejection.class(), rejection.message);
            }
            EXIT_REJECTED
        }
    }
}

fn path(runner: &SecureRunner, candidate: &str, working_dir: bool, as_json: bool) -> i32 {
    let validation = if working_dir {
        runner.sandbox().validate_working_dir(candidate)
    } else {
        runner.sandbox().validate_path(candidate)
    };

    if as_json {
        println!(
            "{}",
            json!({
                "valid": validation.is_valid,
                "sanitized_path": validation.sanitized_path,
                "error": validation.error.as_ref().map(ToString::to_string),
            })
        );
    } else if let Some(resolved) = &validation.sanitized_path {
        println!("{}", resolved.display());
    } else if let Some(error) = &validation.error {
        println!("rejected ({}): {error}", error.class());
    }

    if validation.is_valid { 0 } else { EXIT_REJECTED }
}

fn report_run(outcome: Result<ExecResult, RunError>, as_json: bool) -> Result<i32> {
    let (result, error) = match outcome {
        Ok(result) => (Some(result), None),
        Err(RunError::Terminated { reason, partial }) => {
            let error = RunError::Terminated {
                reason,
                partial: partial.clone(),
            };
            (Some(partial), Some(error))
        }
        Err(error) => (None, Some(error)),
    };

    if as_json {
        let body = json!({
            "exit_code": result.as_ref().and_then(|r| r.exit_code),
            "success": result.as_ref().is_some_and(|r| r.success),
            "stdout": result.as_ref().map(ExecResult::stdout_lossy),
            "stderr": result.as_ref().map(ExecResult::stderr_lossy),
            "termination_reason": result.as_ref().and_then(|r| r.termination_reason),
            "duration_ms": result.as_ref().map(|r| r.duration.as_millis() as u64),
            "error": error.as_ref().map(|e| json!({
                "class": e.class().as_str(),
                "retryable": e.is_retryable(),
                "message": e.to_string(),
            })),
        });
        println!("{body}");
    } else {
        if let Some(result) = &result {
            std::io::stdout()
                .write_all(&result.stdout)
                .context("Failed to write stdout")?;
            std::io::stderr()
                .write_all(&result.stderr)
                .context("Failed to write stderr")?;
        }
        if let Some(error) = &error {
            eprintln!("delve: {error}");
        }
    }

    Ok(match (&error, &result) {
        (Some(error), _) => exit_code_for(error.class()),
        (None, Some(result)) => result.exit_code.unwrap_or(1),
        (None, None) => 1,
    })
}

/// Process exit code for a failure class.
pub fn exit_code_for(class: FailureClass) -> i32 {
    match class {
        FailureClass::ExecutionTimeout => EXIT_TIMEOUT,
        FailureClass::OutputLimitExceeded => EXIT_OUTPUT_LIMIT,
        FailureClass::PolicyViolation
        | FailureClass::ContentRejected
        | FailureClass::PathRejected => EXIT_REJECTED,
        FailureClass::SpawnFailure => EXIT_SPAWN_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_mode_keeps_hyphenated_arguments() {
        let cli = Cli::try_parse_from(["delve", "check", "rg", "-n", "--glob", "*.rs", "main"])
            .unwrap();
        match cli.mode {
            Mode::Check { command, args } => {
                assert_eq!(command, "rg");
                assert_eq!(args, vec!["-n", "--glob", "*.rs", "main"]);
            }
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn global_flags_precede_the_mode() {
        let cli = Cli::try_parse_from([
            "delve",
            "--sandbox-root",
            "/a",
            "--sandbox-root",
            "/b",
            "--timeout-ms",
            "50",
            "run",
            "--cwd",
            "src",
            "ls",
            "-l",
        ])
        .unwrap();
        assert_eq!(cli.sandbox_root, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(cli.timeout_ms, Some(50));
        match cli.mode {
            Mode::Run { cwd, command, args } => {
                assert_eq!(cwd.as_deref(), Some("src"));
                assert_eq!(command, "ls");
                assert_eq!(args, vec!["-l"]);
            }
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn cli_limits_override_the_config() {
        let cli = Cli::try_parse_from([
            "delve",
            "--config",
            "/nonexistent/delve.json",
            "check",
            "ls",
        ])
        .unwrap();
        assert!(load_config(&cli).is_err());

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("security.json");
        std::fs::write(&file, r#"{"limits": {"timeout_ms": 1000}}"#).unwrap();
        let cli = Cli::try_parse_from([
            "delve",
            "--config",
            file.to_str().unwrap(),
            "--max-output-bytes",
            "64",
            "check",
            "ls",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.limits.timeout_ms, 1000);
        assert_eq!(config.limits.max_output_bytes, 64);
    }

    #[test]
    fn exit_codes_follow_the_failure_class() {
        assert_eq!(exit_code_for(FailureClass::ExecutionTimeout), 124);
        assert_eq!(exit_code_for(FailureClass::OutputLimitExceeded), 125);
        assert_eq!(exit_code_for(FailureClass::ContentRejected), 126);
        assert_eq!(exit_code_for(FailureClass::SpawnFailure), 127);
    }
}
