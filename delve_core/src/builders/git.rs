use super::{ArgsBuf, CommandLine};
use crate::policy::AllowedCommand;
use crate::sandbox::SandboxedPath;

/// Read-only git subcommands the builder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitSubcommand {
    Log,
    Show,
    Diff,
    Status,
    Blame,
    LsFiles,
}

impl GitSubcommand {
    pub fn as_str(self) -> &'static str {
        match self {
            GitSubcommand::Log => "log",
            GitSubcommand::Show => "show",
            GitSubcommand::Diff => "diff",
            GitSubcommand::Status => "status",
            GitSubcommand::Blame => "blame",
            GitSubcommand::LsFiles => "ls-files",
        }
    }
}

/// A read-only git query.
#[derive(Debug, Clone)]
pub struct GitQuery {
    subcommand: GitSubcommand,
    revisions: Vec<String>,
    paths: Vec<SandboxedPath>,
    max_count: Option<u32>,
    oneline: bool,
    stat: bool,
    name_only: bool,
    cached: bool,
    short: bool,
    grep: Option<String>,
    author: Option<String>,
    since: Option<String>,
}

impl GitQuery {
    pub fn new(subcommand: GitSubcommand) -> Self {
        Self {
            subcommand,
            revisions: Vec::new(),
            paths: Vec::new(),
            max_count: None,
            oneline: false,
            stat: false,
            name_only: false,
            cached: false,
            short: false,
            grep: None,
            author: None,
            since: None,
        }
    }

    pub fn log() -> Self {
        Self::new(GitSubcommand::Log)
    }

    pub fn status() -> Self {
        Self::new(GitSubcommand::Status)
    }

    pub fn diff() -> Self {
        Self::new(GitSubcommand::Diff)
    }

    pub fn show(revision: impl Into<String>) -> Self {
        Self::new(GitSubcommand::Show).revision(revision)
    }

    pub fn blame(path: SandboxedPath) -> Self {
        Self::new(GitSubcommand::Blame).path(path)
    }

    pub fn ls_files() -> Self {
        Self::new(GitSubcommand::LsFiles)
    }

    /// A revision or range such as `HEAD~3..HEAD`.
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revisions.push(revision.into());
        self
    }

    pub fn path(mut self, path: SandboxedPath) -> Self {
        self.paths.push(path);
        self
    }

    pub fn max_count(mut self, count: u32) -> Self {
        self.max_count = Some(count);
        self
    }

    pub fn oneline(mut self, yes: bool) -> Self {
        self.oneline = yes;
        self
    }

    pub fn stat(mut self, yes: bool) -> Self {
        self.stat = yes;
        self
    }

    pub fn name_only(mut self, yes: bool) -> Self {
        self.name_only = yes;
        self
    }

    pub fn cached(mut self, yes: bool) -> Self {
        self.cached = yes;
        self
    }

    pub fn short(mut self, yes: bool) -> Self {
        self.short = yes;
        self
    }

    /// Commit-message pattern for `log`.
    pub fn grep(mut self, pattern: impl Into<String>) -> Self {
        self.grep = Some(pattern.into());
        self
    }

    pub fn author(mut self, pattern: impl Into<String>) -> Self {
        self.author = Some(pattern.into());
        self
    }

    pub fn since(mut self, date: impl Into<String>) -> Self {
        self.since = Some(date.into());
        self
    }

    pub fn build(&self) -> CommandLine {
        let mut args = ArgsBuf::default();
        args.raw(self.subcommand.as_str())
            .opt_value("--max-count", self.max_count)
            .flag_if(self.oneline, "--oneline")
            .flag_if(self.stat, "--stat")
            .flag_if(self.name_only, "--name-only")
            .flag_if(self.cached, "--cached")
            .flag_if(self.short, "--short")
            .opt_value("--grep", self.grep.as_deref())
            .opt_value("--author", self.author.as_deref())
            .opt_value("--since", self.since.as_deref());
        for revision in &self.revisions {
            args.raw(revision.clone());
        }
        if !self.paths.is_empty() {
            args.flag("--");
            for path in &self.paths {
                args.raw(path.to_arg());
            }
        }
        args.finish(AllowedCommand::Git)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::{assert_valid, path, sandbox};

    #[test]
    fn log_query_is_read_only_and_valid() {
        let (_dir, sandbox) = sandbox();
        let line = GitQuery::log()
            .max_count(5)
            .oneline(true)
            .grep("fix|feat")
            .revision("HEAD~10..HEAD")
            .path(path(&sandbox, "src"))
            .build();
        assert_eq!(line.args()[0], "log");
        assert_eq!(line.args()[line.args().len() - 2], "--");
        assert_valid(&line);
    }

    #[test]
    fn every_subcommand_is_on_the_allowlist() {
        let (dir, sandbox) = sandbox();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        for line in [
            GitQuery::status().short(true).build(),
            GitQuery::diff().cached(true).stat(true).build(),
            GitQuery::show("HEAD").name_only(true).build(),
            GitQuery::blame(path(&sandbox, "src/lib.rs")).build(),
            GitQuery::ls_files().build(),
        ] {
            assert_valid(&line);
        }
    }
}
