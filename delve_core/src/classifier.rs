//! # Pattern Classifier
//!
//! Labels every token of an argument vector with the role it plays for the
//! command that will receive it. The role decides which dangerous-content rule
//! set applies: search patterns and grouping tokens get the permissive set,
//! everything else the strict one.
//!
//! Grammar differs per command, so dispatch is an exhaustive match over
//! [`AllowedCommand`]. Classification is a single left-to-right pass, never
//! touches its input, and never fails: unknown flags are still labelled `Flag`
//! so the validator can reject them.

use crate::policy::{AllowedCommand, CommandPolicy};
use std::fmt;

/// The contextual purpose of one command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentRole {
    Path,
    Pattern,
    Flag,
    FlagValue,
    Structural,
}

impl ArgumentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ArgumentRole::Path => "path",
            ArgumentRole::Pattern => "pattern",
            ArgumentRole::Flag => "flag",
            ArgumentRole::FlagValue => "flag value",
            ArgumentRole::Structural => "structural",
        }
    }
}

impl fmt::Display for ArgumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-of-options marker understood by every allowlisted tool.
pub const END_OF_FLAGS: &str = "--";

/// ripgrep mode that lists the files it would search.
const LIST_FILES: &str = "--files";

/// find grouping and boolean tokens.
const LOCATOR_STRUCTURAL: &[&str] = &[
    "(", ")", "\\(", "\\)", "!", "-not", "-o", "-or", "-a", "-and", ",",
];

/// A token is a flag when it starts with `-` and is not the lone `-` (stdin).
pub fn looks_like_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

/// Name part of a flag token (`--glob=*.rs` -> `--glob`).
pub fn flag_name(token: &str) -> &str {
    token.split_once('=').map_or(token, |(name, _)| name)
}

/// Classify `args` for the command governed by `policy`.
pub fn classify(policy: &CommandPolicy, args: &[String]) -> Vec<ArgumentRole> {
    match policy.command() {
        AllowedCommand::Rg | AllowedCommand::Grep => classify_searcher(policy, args),
        AllowedCommand::Find => classify_locator(policy, args),
        AllowedCommand::Ls | AllowedCommand::Git | AllowedCommand::Npm => {
            classify_generic(policy, args)
        }
    }
}

/// rg/grep: first positional is the pattern, later positionals are paths.
fn classify_searcher(policy: &CommandPolicy, args: &[String]) -> Vec<ArgumentRole> {
    walk_searcher(policy, args).0
}

/// Searcher roles, and whether the search pattern was given before `--`.
///
/// `rg --files` lists files instead of searching, so it takes no pattern and
/// every positional is a path.
fn walk_searcher(policy: &CommandPolicy, args: &[String]) -> (Vec<ArgumentRole>, bool) {
    let mut roles = vec![ArgumentRole::Path; args.len()];
    let mut pattern_seen = args
        .iter()
        .take_while(|token| *token != END_OF_FLAGS)
        .any(|token| token == LIST_FILES);
    let mut index = 0;

    while index < args.len() {
        let token = args[index].as_str();

        if token == END_OF_FLAGS {
            roles[index] = ArgumentRole::Structural;
            for role in &mut roles[index + 1..] {
                *role = ArgumentRole::Pattern;
            }
            break;
        }

        if looks_like_flag(token) {
            roles[index] = ArgumentRole::Flag;
            let name = flag_name(token);
            let inline_value = token.contains('=');
            if let Some(value_role) = policy.value_role(name) {
                if is_search_pattern_flag(name) {
                    pattern_seen = true;
                }
                if !inline_value && index + 1 < args.len() {
                    roles[index + 1] = value_role;
                    index += 1;
                }
            }
        } else if !pattern_seen {
            roles[index] = ArgumentRole::Pattern;
            pattern_seen = true;
        }

        index += 1;
    }

    (roles, pattern_seen)
}

/// `-e PATTERN` supplies the search pattern itself, so the first positional is a path.
fn is_search_pattern_flag(name: &str) -> bool {
    matches!(name, "-e" | "--regexp")
}

/// find: starting points, then an expression of operators and operands.
fn classify_locator(policy: &CommandPolicy, args: &[String]) -> Vec<ArgumentRole> {
    let mut roles = vec![ArgumentRole::Path; args.len()];
    let mut index = 0;

    while index < args.len() {
        let token = args[index].as_str();

        if LOCATOR_STRUCTURAL.contains(&token) {
            roles[index] = ArgumentRole::Structural;
        } else if looks_like_flag(token) {
            roles[index] = ArgumentRole::Flag;
            if let Some(value_role) = policy.value_role(flag_name(token))
                && !token.contains('=')
                && index + 1 < args.len()
            {
                roles[index + 1] = value_role;
                index += 1;
            }
        }
        // Anything else, starting point or stray operand, keeps the strict Path role.

        index += 1;
    }

    roles
}

/// ls/git/npm: flags and their values, everything else a path.
///
/// For git and npm the first positional is the subcommand. A subcommand may
/// change flag grammar (`git grep -n`) or take a positional search pattern.
fn classify_generic(policy: &CommandPolicy, args: &[String]) -> Vec<ArgumentRole> {
    let mut roles = vec![ArgumentRole::Path; args.len()];
    let mut subcommand: Option<&str> = None;
    let mut pattern_pending = false;
    let mut index = 0;

    while index < args.len() {
        let token = args[index].as_str();

        if token == END_OF_FLAGS {
            roles[index] = ArgumentRole::Structural;
            break;
        }

        if looks_like_flag(token) {
            roles[index] = ArgumentRole::Flag;
            let name = flag_name(token);
            if let Some(value_role) = policy.value_role_in(name, subcommand) {
                if is_search_pattern_flag(name) {
                    pattern_pending = false;
                }
                if !token.contains('=') && index + 1 < args.len() {
                    roles[index + 1] = value_role;
                    index += 1;
                }
            }
        } else if policy.requires_subcommand() && subcommand.is_none() {
            subcommand = Some(token);
            pattern_pending = policy.takes_positional_pattern(token);
        } else if pattern_pending {
            roles[index] = ArgumentRole::Pattern;
            pattern_pending = false;
        }

        index += 1;
    }

    roles
}

/// The subcommand token of a git or npm argument vector: its first positional.
pub fn subcommand<'a>(
    policy: &CommandPolicy,
    args: &'a [String],
    roles: &[ArgumentRole],
) -> Option<&'a str> {
    if !policy.requires_subcommand() {
        return None;
    }
    roles
        .iter()
        .position(|role| *role == ArgumentRole::Path)
        .map(|index| args[index].as_str())
}

/// True when `token` can only be read as a filesystem location: absolute,
/// home-relative, explicitly relative (`.`/`./`), or stepping through `..`.
pub fn looks_like_path(token: &str) -> bool {
    token.starts_with('/')
        || token.starts_with('~')
        || token == "."
        || token.starts_with("./")
        || token.split('/').any(|component| component == "..")
}

/// Positionals of git and npm, after the subcommand and before `--`, that may
/// name either a filesystem path or something else (a revision, a package).
///
/// git silently switches `diff` to `--no-index` when an operand lies outside
/// the work tree, so these are confined whenever they look like a path or
/// name an existing file.
pub fn ambiguous_operands(policy: &CommandPolicy, args: &[String]) -> Vec<usize> {
    match policy.command() {
        AllowedCommand::Git | AllowedCommand::Npm => {}
        _ => return Vec::new(),
    }
    let roles = classify_generic(policy, args);
    let end = roles
        .iter()
        .zip(args)
        .position(|(role, token)| *role == ArgumentRole::Structural && token == END_OF_FLAGS)
        .unwrap_or(args.len());
    roles[..end]
        .iter()
        .enumerate()
        .filter(|(_, role)| **role == ArgumentRole::Path)
        .map(|(index, _)| index)
        .skip(1)
        .collect()
}

/// Indexes of the operands the program will open as files or directories.
///
/// These must be resolved through the sandbox before execution. For searchers
/// this includes the tokens after `--` that follow the search pattern; for git
/// only pathspecs after `--` count here, since revisions share the positional
/// slots (see [`ambiguous_operands`]). npm operands are package names.
pub fn path_operands(policy: &CommandPolicy, args: &[String]) -> Vec<usize> {
    let with_role = |roles: &[ArgumentRole]| -> Vec<usize> {
        roles
            .iter()
            .enumerate()
            .filter(|(_, role)| **role == ArgumentRole::Path)
            .map(|(index, _)| index)
            .collect()
    };
    // Operands after a `--` the tool itself treats as end of options.
    let after_end = |roles: &[ArgumentRole], skip: usize| -> Vec<usize> {
        let end = roles
            .iter()
            .zip(args)
            .position(|(role, token)| *role == ArgumentRole::Structural && token == END_OF_FLAGS);
        match end {
            Some(end) => ((end + 1 + skip).min(args.len())..args.len()).collect(),
            None => Vec::new(),
        }
    };

    match policy.command() {
        AllowedCommand::Rg | AllowedCommand::Grep => {
            let (roles, pattern_seen) = walk_searcher(policy, args);
            let mut operands = with_role(&roles);
            operands.extend(after_end(&roles, usize::from(!pattern_seen)));
            operands
        }
        AllowedCommand::Find => with_role(&classify_locator(policy, args)),
        AllowedCommand::Ls => with_role(&classify_generic(policy, args)),
        AllowedCommand::Git => after_end(&classify_generic(policy, args), 0),
        AllowedCommand::Npm => Vec::new(),
    }
}
