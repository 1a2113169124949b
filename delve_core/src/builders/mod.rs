//! # Command Builders
//!
//! Typed constructors for the argument vectors the agent-facing tools need.
//! Path slots only accept [`SandboxedPath`](crate::sandbox::SandboxedPath), so a
//! command line built here cannot name a path that skipped the sandbox check.
//! Search patterns and paths are always separated from flags with `--` where
//! the tool understands it.
//!
//! A built [`CommandLine`] is still untrusted: it goes through the validator
//! like any other.

mod find;
mod git;
mod ls;
mod ripgrep;

pub use find::{FileKind, FindQuery};
pub use git::{GitQuery, GitSubcommand};
pub use ls::{LsQuery, LsSort};
pub use ripgrep::RipgrepQuery;

use crate::policy::AllowedCommand;

/// A command name and its argument vector, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    command: AllowedCommand,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(command: AllowedCommand, args: Vec<String>) -> Self {
        Self { command, args }
    }

    pub fn command(&self) -> AllowedCommand {
        self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

/// Common argument pushing for the builders.
#[derive(Default)]
struct ArgsBuf(Vec<String>);

impl ArgsBuf {
    fn flag(&mut self, flag: &str) -> &mut Self {
        self.0.push(flag.to_string());
        self
    }

    fn flag_if(&mut self, enabled: bool, flag: &str) -> &mut Self {
        if enabled {
            self.flag(flag);
        }
        self
    }

    fn value(&mut self, flag: &str, value: impl ToString) -> &mut Self {
        self.0.push(flag.to_string());
        self.0.push(value.to_string());
        self
    }

    fn opt_value<T: ToString>(&mut self, flag: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.value(flag, value);
        }
        self
    }

    fn raw(&mut self, arg: impl Into<String>) -> &mut Self {
        self.0.push(arg.into());
        self
    }

    fn finish(self, command: AllowedCommand) -> CommandLine {
        CommandLine::new(command, self.0)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::policy::PolicyTable;
    use crate::sandbox::{Sandbox, SandboxedPath};
    use crate::validator::CommandValidator;
    use std::sync::Arc;
    use tempfile::TempDir;

    use super::CommandLine;

    pub(crate) fn sandbox() -> (TempDir, Sandbox) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let sandbox = Sandbox::new(vec![dir.path().to_path_buf()]).unwrap();
        (dir, sandbox)
    }

    pub(crate) fn path(sandbox: &Sandbox, candidate: &str) -> SandboxedPath {
        sandbox.resolve(candidate).unwrap()
    }

    pub(crate) fn assert_valid(line: &CommandLine) {
        let validator = CommandValidator::new(Arc::new(PolicyTable::builtin()));
        let outcome = validator.validate(line.command().name(), line.args());
        assert!(outcome.is_valid(), "{:?}: {:?}", line.args(), outcome);
    }
}
