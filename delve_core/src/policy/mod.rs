//! # Command Policy
//!
//! The closed set of commands that may ever be spawned, and the per-command
//! flag tables the validator checks argument vectors against.
//!
//! - **`AllowedCommand`**: the allowlist itself. Anything that does not parse
//!   into this enum is rejected before any other check runs.
//! - **`CommandPolicy`**: bare flags, value-consuming flags, flags whose value is
//!   a search pattern or a path, locator operators that are never acceptable,
//!   and an optional read-only subcommand allowlist.
//! - **`PolicyTable`**: one `CommandPolicy` per `AllowedCommand`, built once at
//!   startup (builtin tables, optionally narrowed by configuration) and shared
//!   read-only behind an `Arc`.
//!
//! Configuration can only narrow a policy. There is no way to add a flag or to
//! lift a disallowed operator at runtime.

mod tables;

use crate::classifier::ArgumentRole;
use crate::config::CommandOverride;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The closed allowlist of external programs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AllowedCommand {
    /// ripgrep, the recursive searcher.
    Rg,
    /// grep, the fallback searcher.
    Grep,
    /// find, the file locator.
    Find,
    /// ls, the directory lister.
    Ls,
    /// git, the version-control client (read-only subcommands).
    Git,
    /// npm, the package-registry client (read-only subcommands).
    Npm,
}

impl AllowedCommand {
    pub const ALL: [AllowedCommand; 6] = [
        AllowedCommand::Rg,
        AllowedCommand::Grep,
        AllowedCommand::Find,
        AllowedCommand::Ls,
        AllowedCommand::Git,
        AllowedCommand::Npm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AllowedCommand::Rg => "rg",
            AllowedCommand::Grep => "grep",
            AllowedCommand::Find => "find",
            AllowedCommand::Ls => "ls",
            AllowedCommand::Git => "git",
            AllowedCommand::Npm => "npm",
        }
    }

    fn index(self) -> usize {
        match self {
            AllowedCommand::Rg => 0,
            AllowedCommand::Grep => 1,
            AllowedCommand::Find => 2,
            AllowedCommand::Ls => 3,
            AllowedCommand::Git => 4,
            AllowedCommand::Npm => 5,
        }
    }
}

impl fmt::Display for AllowedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a command name is not on the allowlist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command '{0}' is not on the allowlist")]
pub struct UnknownCommandError(pub String);

impl FromStr for AllowedCommand {
    type Err = UnknownCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AllowedCommand::ALL
            .into_iter()
            .find(|command| command.name() == s)
            .ok_or_else(|| UnknownCommandError(crate::error::preview(s)))
    }
}

/// Static policy for one allowlisted command.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    command: AllowedCommand,
    binary: PathBuf,
    enabled: bool,
    bare_flags: BTreeSet<String>,
    value_flags: BTreeSet<String>,
    pattern_flags: BTreeSet<String>,
    path_flags: BTreeSet<String>,
    disallowed_operators: BTreeSet<String>,
    subcommands: Option<BTreeSet<String>>,
    /// Value flags that are bare within one subcommand (`git grep -n`).
    subcommand_bare: BTreeMap<String, BTreeSet<String>>,
    /// Subcommands whose first positional is a search pattern.
    pattern_subcommands: BTreeSet<String>,
}

impl CommandPolicy {
    pub fn command(&self) -> AllowedCommand {
        self.command
    }

    /// Program handed to the process spawner.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_bare_flag(&self, flag: &str) -> bool {
        self.bare_flags.contains(flag)
    }

    pub fn is_value_flag(&self, flag: &str) -> bool {
        self.value_flags.contains(flag)
    }

    /// Role of the value consumed by `flag`, or `None` when `flag` takes no value.
    pub fn value_role(&self, flag: &str) -> Option<ArgumentRole> {
        if !self.value_flags.contains(flag) {
            None
        } else if self.pattern_flags.contains(flag) {
            Some(ArgumentRole::Pattern)
        } else if self.path_flags.contains(flag) {
            Some(ArgumentRole::Path)
        } else {
            Some(ArgumentRole::FlagValue)
        }
    }

    /// True when `flag` is bare in the context of `subcommand`.
    pub fn is_bare_flag_in(&self, flag: &str, subcommand: Option<&str>) -> bool {
        self.is_bare_flag(flag) || self.bare_in_subcommand(flag, subcommand)
    }

    /// True when `flag` consumes a value in the context of `subcommand`.
    pub fn is_value_flag_in(&self, flag: &str, subcommand: Option<&str>) -> bool {
        self.is_value_flag(flag) && !self.bare_in_subcommand(flag, subcommand)
    }

    /// [`value_role`](Self::value_role) in the context of `subcommand`.
    pub fn value_role_in(&self, flag: &str, subcommand: Option<&str>) -> Option<ArgumentRole> {
        if self.bare_in_subcommand(flag, subcommand) {
            None
        } else {
            self.value_role(flag)
        }
    }

    /// True when the first positional after `subcommand` is a search pattern.
    pub fn takes_positional_pattern(&self, subcommand: &str) -> bool {
        self.pattern_subcommands.contains(subcommand)
    }

    fn bare_in_subcommand(&self, flag: &str, subcommand: Option<&str>) -> bool {
        subcommand
            .and_then(|name| self.subcommand_bare.get(name))
            .is_some_and(|flags| flags.contains(flag))
    }

    /// True when `token` is (or starts with `<operator>=`) a disallowed operator.
    pub fn is_disallowed_operator(&self, token: &str) -> bool {
        let name = token.split_once('=').map_or(token, |(name, _)| name);
        self.disallowed_operators.contains(name)
    }

    pub fn disallowed_operators(&self) -> impl Iterator<Item = &str> {
        self.disallowed_operators.iter().map(String::as_str)
    }

    pub fn requires_subcommand(&self) -> bool {
        self.subcommands.is_some()
    }

    pub fn allows_subcommand(&self, subcommand: &str) -> bool {
        self.subcommands
            .as_ref()
            .is_none_or(|allowed| allowed.contains(subcommand))
    }

    pub fn subcommands(&self) -> impl Iterator<Item = &str> {
        self.subcommands.iter().flatten().map(String::as_str)
    }

    /// True when `flag` is known to this policy in any form.
    pub fn knows_flag(&self, flag: &str) -> bool {
        self.bare_flags.contains(flag)
            || self.value_flags.contains(flag)
            || self.subcommand_bare.values().any(|flags| flags.contains(flag))
    }

    fn deny_flag(&mut self, flag: &str) {
        self.bare_flags.remove(flag);
        self.value_flags.remove(flag);
        self.pattern_flags.remove(flag);
        self.path_flags.remove(flag);
        for flags in self.subcommand_bare.values_mut() {
            flags.remove(flag);
        }
    }

    fn deny_subcommand(&mut self, subcommand: &str) {
        if let Some(allowed) = self.subcommands.as_mut() {
            allowed.remove(subcommand);
        }
    }

    fn apply_override(&mut self, over: &CommandOverride) {
        self.enabled = over.enabled;
        if let Some(binary) = &over.binary {
            self.binary = binary.clone();
        }
        for flag in &over.deny_flags {
            self.deny_flag(flag);
        }
        for subcommand in &over.deny_subcommands {
            self.deny_subcommand(subcommand);
        }
    }
}

/// The complete, immutable policy for every allowlisted command.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: [CommandPolicy; 6],
}

impl PolicyTable {
    /// The builtin policy with every command enabled.
    pub fn builtin() -> Self {
        Self {
            policies: AllowedCommand::ALL.map(tables::builtin),
        }
    }

    /// The builtin policy narrowed by per-command overrides.
    pub fn with_overrides(overrides: &BTreeMap<AllowedCommand, CommandOverride>) -> Self {
        let mut table = Self::builtin();
        for (command, over) in overrides {
            tracing::debug!(
                command = command.name(),
                enabled = over.enabled,
                denied_flags = over.deny_flags.len(),
                "applying command policy override"
            );
            table.policies[command.index()].apply_override(over);
        }
        table
    }

    pub fn policy(&self, command: AllowedCommand) -> &CommandPolicy {
        &self.policies[command.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandPolicy> {
        self.policies.iter()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_round_trips_through_its_name() {
        for command in AllowedCommand::ALL {
            assert_eq!(command.name().parse::<AllowedCommand>(), Ok(command));
        }
    }

    #[test]
    fn unknown_command_names_are_errors() {
        assert!("bash".parse::<AllowedCommand>().is_err());
        assert!("".parse::<AllowedCommand>().is_err());
        assert!("RG".parse::<AllowedCommand>().is_err());
        assert!("rg ".parse::<AllowedCommand>().is_err());
    }

    #[test]
    fn table_is_indexed_by_command() {
        let table = PolicyTable::builtin();
        for command in AllowedCommand::ALL {
            assert_eq!(table.policy(command).command(), command);
        }
    }

    #[test]
    fn find_operators_match_with_inline_values() {
        let table = PolicyTable::builtin();
        let find = table.policy(AllowedCommand::Find);
        assert!(find.is_disallowed_operator("-delete"));
        assert!(find.is_disallowed_operator("-exec"));
        assert!(find.is_disallowed_operator("-printf=%p"));
        assert!(!find.is_disallowed_operator("-name"));
    }

    #[test]
    fn value_roles_follow_flag_kind() {
        let table = PolicyTable::builtin();
        let rg = table.policy(AllowedCommand::Rg);
        assert_eq!(rg.value_role("--glob"), Some(ArgumentRole::Pattern));
        assert_eq!(rg.value_role("-m"), Some(ArgumentRole::FlagValue));
        assert_eq!(rg.value_role("-i"), None);

        let find = table.policy(AllowedCommand::Find);
        assert_eq!(find.value_role("-newer"), Some(ArgumentRole::Path));
        assert_eq!(find.value_role("-name"), Some(ArgumentRole::Pattern));
    }

    #[test]
    fn overrides_only_narrow() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            AllowedCommand::Rg,
            CommandOverride {
                enabled: true,
                binary: Some(PathBuf::from("/opt/bin/rg")),
                deny_flags: vec!["--hidden".to_string(), "--not-a-flag".to_string()],
                deny_subcommands: Vec::new(),
            },
        );
        overrides.insert(
            AllowedCommand::Git,
            CommandOverride {
                enabled: true,
                binary: None,
                deny_flags: Vec::new(),
                deny_subcommands: vec!["blame".to_string()],
            },
        );
        overrides.insert(
            AllowedCommand::Npm,
            CommandOverride {
                enabled: false,
                ..CommandOverride::default()
            },
        );

        let table = PolicyTable::with_overrides(&overrides);
        let rg = table.policy(AllowedCommand::Rg);
        assert_eq!(rg.binary(), Path::new("/opt/bin/rg"));
        assert!(!rg.knows_flag("--hidden"));
        assert!(rg.knows_flag("--ignore-case"));

        let git = table.policy(AllowedCommand::Git);
        assert!(!git.allows_subcommand("blame"));
        assert!(git.allows_subcommand("log"));

        assert!(!table.policy(AllowedCommand::Npm).is_enabled());
        assert!(table.policy(AllowedCommand::Find).is_enabled());
    }
}
