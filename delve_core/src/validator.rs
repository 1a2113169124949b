//! # Command Allowlist & Flag Validator
//!
//! The gate every argument vector passes before it can be executed. Checks run
//! in a fixed order and the first failure wins:
//!
//! 1. the command is on the allowlist and enabled;
//! 2. no locator operator from the disallowed set appears, in any position;
//! 3. commands with a subcommand allowlist name an allowed subcommand;
//! 4. every flag is a known bare flag or a known value flag with a value;
//! 5. argument count and length stay within bounds, and every token passes the
//!    dangerous-content rule set its role selects.
//!
//! The validator is a pure function of its input and the shared policy table.
//! It never panics on untrusted input and never echoes a rejected value back.

use crate::classifier::{self, ArgumentRole};
use crate::error::{Rejection, RejectionKind, preview};
use crate::policy::{AllowedCommand, CommandPolicy, PolicyTable};
use crate::scanner::{self, RuleSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of validating one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid { reason: Rejection },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid { reason } => Some(reason),
        }
    }
}

/// Bounds on the size of an argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ArgumentLimits {
    /// Maximum number of arguments after the command name.
    pub max_args: usize,
    /// Maximum length of one argument in bytes.
    pub max_arg_len: usize,
}

impl Default for ArgumentLimits {
    fn default() -> Self {
        Self {
            max_args: 256,
            max_arg_len: 4096,
        }
    }
}

/// A command line that passed validation. Only the validator can build one,
/// which is what makes it the executor's sole input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCommand {
    command: AllowedCommand,
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ValidatedCommand {
    pub fn command(&self) -> AllowedCommand {
        self.command
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Attach the working directory. The executor re-validates it against the
    /// sandbox immediately before spawning.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        command: AllowedCommand,
        program: impl Into<PathBuf>,
        args: &[&str],
    ) -> Self {
        Self {
            command,
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            working_dir: None,
        }
    }
}

/// Validates command lines against a shared, read-only [`PolicyTable`].
#[derive(Debug, Clone)]
pub struct CommandValidator {
    policies: Arc<PolicyTable>,
    limits: ArgumentLimits,
}

impl CommandValidator {
    pub fn new(policies: Arc<PolicyTable>) -> Self {
        Self {
            policies,
            limits: ArgumentLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ArgumentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn limits(&self) -> ArgumentLimits {
        self.limits
    }

    /// Validate `command` with `args`.
    pub fn validate(&self, command: &str, args: &[String]) -> ValidationOutcome {
        match self.check(command, args) {
            Ok(_) => ValidationOutcome::Valid,
            Err(reason) => ValidationOutcome::Invalid { reason },
        }
    }

    /// Validate and, on success, produce the only value the executor accepts.
    pub fn authorize(&self, command: &str, args: &[String]) -> Result<ValidatedCommand, Rejection> {
        let policy = self.check(command, args)?;
        Ok(ValidatedCommand {
            command: policy.command(),
            program: policy.binary().to_path_buf(),
            args: args.to_vec(),
            working_dir: None,
        })
    }

    fn check(&self, command: &str, args: &[String]) -> Result<&CommandPolicy, Rejection> {
        let result = self.run_checks(command, args);
        if let Err(rejection) = &result {
            // The rejected payload stays out of the log; kind and reason are enough.
            tracing::debug!(
                kind = ?rejection.kind,
                arg_count = args.len(),
                "command line rejected: {}",
                rejection.message
            );
        }
        result
    }

    fn run_checks(&self, command: &str, args: &[String]) -> Result<&CommandPolicy, Rejection> {
        let allowed: AllowedCommand = command
            .parse()
            .map_err(|e| Rejection::new(RejectionKind::UnknownCommand, format!("{e}")))?;
        let policy = self.policies.policy(allowed);
        if !policy.is_enabled() {
            return Err(Rejection::new(
                RejectionKind::CommandDisabled,
                format!("command '{allowed}' is disabled by configuration"),
            ));
        }

        check_operators(policy, args)?;

        let roles = classifier::classify(policy, args);
        check_subcommand(policy, args, &roles)?;
        check_flags(policy, args, &roles)?;
        self.check_limits(args)?;
        check_content(policy, args, &roles)?;

        Ok(policy)
    }

    fn check_limits(&self, args: &[String]) -> Result<(), Rejection> {
        if args.len() > self.limits.max_args {
            return Err(Rejection::new(
                RejectionKind::ArgumentLimit,
                format!(
                    "{} arguments exceed the limit of {}",
                    args.len(),
                    self.limits.max_args
                ),
            ));
        }
        if let Some((index, arg)) = args
            .iter()
            .enumerate()
            .find(|(_, arg)| arg.len() > self.limits.max_arg_len)
        {
            return Err(Rejection::new(
                RejectionKind::ArgumentLimit,
                format!(
                    "argument #{index} is {} bytes, over the limit of {}",
                    arg.len(),
                    self.limits.max_arg_len
                ),
            ));
        }
        Ok(())
    }
}

/// Disallowed operators are refused regardless of the role a token was given.
fn check_operators(policy: &CommandPolicy, args: &[String]) -> Result<(), Rejection> {
    match args.iter().find(|arg| policy.is_disallowed_operator(arg)) {
        Some(arg) => Err(Rejection::new(
            RejectionKind::DisallowedOperator,
            format!(
                "operator '{}' is never permitted for {}",
                preview(classifier::flag_name(arg)),
                policy.command()
            ),
        )),
        None => Ok(()),
    }
}

fn check_subcommand(
    policy: &CommandPolicy,
    args: &[String],
    roles: &[ArgumentRole],
) -> Result<(), Rejection> {
    if !policy.requires_subcommand() {
        return Ok(());
    }
    match classifier::subcommand(policy, args, roles) {
        Some(name) if policy.allows_subcommand(name) => Ok(()),
        Some(name) => Err(Rejection::new(
            RejectionKind::DisallowedSubcommand,
            format!(
                "subcommand '{}' is not permitted for {}",
                preview(name),
                policy.command()
            ),
        )),
        None => Err(Rejection::new(
            RejectionKind::DisallowedSubcommand,
            format!("{} requires a read-only subcommand", policy.command()),
        )),
    }
}

fn check_flags(
    policy: &CommandPolicy,
    args: &[String],
    roles: &[ArgumentRole],
) -> Result<(), Rejection> {
    let subcommand = classifier::subcommand(policy, args, roles);
    for (index, (arg, role)) in args.iter().zip(roles).enumerate() {
        if *role != ArgumentRole::Flag {
            continue;
        }

        let name = classifier::flag_name(arg);
        let has_inline_value = arg.len() != name.len();

        if policy.is_value_flag_in(name, subcommand) {
            // The classifier hands the next token to a value flag whenever one exists.
            if !has_inline_value && index + 1 >= args.len() {
                return Err(Rejection::new(
                    RejectionKind::MissingFlagValue,
                    format!("flag '{}' requires a value", preview(name)),
                ));
            }
        } else if has_inline_value || !policy.is_bare_flag_in(name, subcommand) {
            return Err(Rejection::new(
                RejectionKind::DisallowedFlag,
                format!(
                    "flag '{}' is not permitted for {}",
                    preview(name),
                    policy.command()
                ),
            ));
        }
    }
    Ok(())
}

fn check_content(
    policy: &CommandPolicy,
    args: &[String],
    roles: &[ArgumentRole],
) -> Result<(), Rejection> {
    for (index, (arg, role)) in args.iter().zip(roles).enumerate() {
        let hit = match role {
            ArgumentRole::Flag => scan_flag_token(policy, arg),
            ArgumentRole::Pattern | ArgumentRole::Structural => {
                scanner::scan(arg, RuleSet::PatternPermissive)
            }
            ArgumentRole::Path | ArgumentRole::FlagValue => scanner::scan(arg, RuleSet::Strict),
        };
        if let Some(rule) = hit {
            return Err(Rejection::new(
                RejectionKind::DangerousContent,
                format!(
                    "argument #{index} ({role}) rejected: {} ({})",
                    rule.description, rule.name
                ),
            ));
        }
    }
    Ok(())
}

/// A flag's name is scanned strictly; an inline `=value` is scanned as its role.
fn scan_flag_token(
    policy: &CommandPolicy,
    arg: &str,
) -> Option<&'static scanner::DangerousPattern> {
    match arg.split_once('=') {
        Some((name, value)) => scanner::scan_flag(name, RuleSet::Strict).or_else(|| {
            match policy.value_role(name) {
                Some(ArgumentRole::Pattern) => scanner::scan(value, RuleSet::PatternPermissive),
                _ => scanner::scan(value, RuleSet::Strict),
            }
        }),
        None => scanner::scan_flag(arg, RuleSet::Strict),
    }
}
