use super::{ArgsBuf, CommandLine};
use crate::policy::AllowedCommand;
use crate::sandbox::SandboxedPath;

/// `--sort` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsSort {
    Name,
    Size,
    Time,
    Extension,
}

impl LsSort {
    fn as_arg(self) -> &'static str {
        match self {
            LsSort::Name => "name",
            LsSort::Size => "size",
            LsSort::Time => "time",
            LsSort::Extension => "extension",
        }
    }
}

/// A directory listing with ls.
#[derive(Debug, Clone, Default)]
pub struct LsQuery {
    paths: Vec<SandboxedPath>,
    all: bool,
    long: bool,
    human_readable: bool,
    recursive: bool,
    directories_first: bool,
    sort: Option<LsSort>,
}

impl LsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: SandboxedPath) -> Self {
        self.paths.push(path);
        self
    }

    pub fn all(mut self, yes: bool) -> Self {
        self.all = yes;
        self
    }

    pub fn long(mut self, yes: bool) -> Self {
        self.long = yes;
        self
    }

    pub fn human_readable(mut self, yes: bool) -> Self {
        self.human_readable = yes;
        self
    }

    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    pub fn directories_first(mut self, yes: bool) -> Self {
        self.directories_first = yes;
        self
    }

    pub fn sort(mut self, sort: LsSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn build(&self) -> CommandLine {
        let mut args = ArgsBuf::default();
        args.flag_if(self.all, "-A")
            .flag_if(self.long, "-l")
            .flag_if(self.human_readable, "-h")
            .flag_if(self.recursive, "-R")
            .flag_if(self.directories_first, "--group-directories-first")
            .opt_value("--sort", self.sort.map(LsSort::as_arg));
        if !self.paths.is_empty() {
            args.flag("--");
            for path in &self.paths {
                args.raw(path.to_arg());
            }
        }
        args.finish(AllowedCommand::Ls)
    }
}
