use super::{ArgsBuf, CommandLine};
use crate::policy::AllowedCommand;
use crate::sandbox::SandboxedPath;

/// `-type` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

impl FileKind {
    fn as_arg(self) -> &'static str {
        match self {
            FileKind::File => "f",
            FileKind::Directory => "d",
            FileKind::Symlink => "l",
        }
    }
}

/// A file search with find. Only read-only predicates can be expressed.
#[derive(Debug, Clone)]
pub struct FindQuery {
    start: Vec<SandboxedPath>,
    max_depth: Option<u32>,
    min_depth: Option<u32>,
    kind: Option<FileKind>,
    name: Option<String>,
    iname: Option<String>,
    path_glob: Option<String>,
    newer_than: Option<SandboxedPath>,
    modified_within_days: Option<u32>,
    size: Option<String>,
    empty: bool,
}

impl FindQuery {
    pub fn new(start: SandboxedPath) -> Self {
        Self {
            start: vec![start],
            max_depth: None,
            min_depth: None,
            kind: None,
            name: None,
            iname: None,
            path_glob: None,
            newer_than: None,
            modified_within_days: None,
            size: None,
            empty: false,
        }
    }

    pub fn also_in(mut self, start: SandboxedPath) -> Self {
        self.start.push(start);
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn min_depth(mut self, depth: u32) -> Self {
        self.min_depth = Some(depth);
        self
    }

    pub fn kind(mut self, kind: FileKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn name(mut self, glob: impl Into<String>) -> Self {
        self.name = Some(glob.into());
        self
    }

    pub fn iname(mut self, glob: impl Into<String>) -> Self {
        self.iname = Some(glob.into());
        self
    }

    pub fn path_glob(mut self, glob: impl Into<String>) -> Self {
        self.path_glob = Some(glob.into());
        self
    }

    pub fn newer_than(mut self, reference: SandboxedPath) -> Self {
        self.newer_than = Some(reference);
        self
    }

    pub fn modified_within_days(mut self, days: u32) -> Self {
        self.modified_within_days = Some(days);
        self
    }

    /// find size expression such as `+1M` or `-10k`.
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn empty(mut self, yes: bool) -> Self {
        self.empty = yes;
        self
    }

    pub fn build(&self) -> CommandLine {
        let mut args = ArgsBuf::default();
        for start in &self.start {
            args.raw(start.to_arg());
        }
        args.opt_value("-maxdepth", self.max_depth)
            .opt_value("-mindepth", self.min_depth)
            .opt_value("-type", self.kind.map(FileKind::as_arg))
            .opt_value("-name", self.name.as_deref())
            .opt_value("-iname", self.iname.as_deref())
            .opt_value("-path", self.path_glob.as_deref())
            .opt_value("-newer", self.newer_than.as_ref().map(SandboxedPath::to_arg))
            .opt_value(
                "-mtime",
                self.modified_within_days.map(|days| format!("-{days}")),
            )
            .opt_value("-size", self.size.as_deref())
            .flag_if(self.empty, "-empty");
        args.finish(AllowedCommand::Find)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::{assert_valid, path, sandbox};

    #[test]
    fn start_points_come_before_the_expression() {
        let (_dir, sandbox) = sandbox();
        let src = path(&sandbox, "src");
        let line = FindQuery::new(src.clone())
            .max_depth(3)
            .kind(FileKind::File)
            .name("*.{rs,toml}")
            .modified_within_days(7)
            .size("+1k")
            .build();

        assert_eq!(line.command(), AllowedCommand::Find);
        assert_eq!(line.args()[0], src.to_arg());
        assert_eq!(
            &line.args()[1..],
            &[
                "-maxdepth", "3", "-type", "f", "-name", "*.{rs,toml}", "-mtime", "-7", "-size",
                "+1k"
            ]
        );
        assert_valid(&line);
    }

    #[test]
    fn reference_file_is_a_sandboxed_path() {
        let (dir, sandbox) = sandbox();
        std::fs::write(dir.path().join("stamp"), "").unwrap();
        let line = FindQuery::new(path(&sandbox, "."))
            .newer_than(path(&sandbox, "stamp"))
            .empty(true)
            .build();
        assert_eq!(line.args().last().map(String::as_str), Some("-empty"));
        assert_valid(&line);
    }
}
