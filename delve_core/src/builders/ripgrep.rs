use super::{ArgsBuf, CommandLine};
use crate::policy::AllowedCommand;
use crate::sandbox::SandboxedPath;

/// A content search with ripgrep.
#[derive(Debug, Clone, Default)]
pub struct RipgrepQuery {
    pattern: String,
    paths: Vec<SandboxedPath>,
    globs: Vec<String>,
    file_types: Vec<String>,
    ignore_case: bool,
    fixed_strings: bool,
    word: bool,
    hidden: bool,
    files_with_matches: bool,
    context: Option<u32>,
    max_count: Option<u32>,
    max_depth: Option<u32>,
}

impl RipgrepQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn path(mut self, path: SandboxedPath) -> Self {
        self.paths.push(path);
        self
    }

    pub fn glob(mut self, glob: impl Into<String>) -> Self {
        self.globs.push(glob.into());
        self
    }

    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_types.push(file_type.into());
        self
    }

    pub fn ignore_case(mut self, yes: bool) -> Self {
        self.ignore_case = yes;
        self
    }

    pub fn fixed_strings(mut self, yes: bool) -> Self {
        self.fixed_strings = yes;
        self
    }

    pub fn word(mut self, yes: bool) -> Self {
        self.word = yes;
        self
    }

    pub fn hidden(mut self, yes: bool) -> Self {
        self.hidden = yes;
        self
    }

    pub fn files_with_matches(mut self, yes: bool) -> Self {
        self.files_with_matches = yes;
        self
    }

    pub fn context(mut self, lines: u32) -> Self {
        self.context = Some(lines);
        self
    }

    pub fn max_count(mut self, count: u32) -> Self {
        self.max_count = Some(count);
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn build(&self) -> CommandLine {
        let mut args = ArgsBuf::default();
        args.flag("--no-config")
            .flag("--line-number")
            .flag_if(self.ignore_case, "--ignore-case")
            .flag_if(self.fixed_strings, "--fixed-strings")
            .flag_if(self.word, "--word-regexp")
            .flag_if(self.hidden, "--hidden")
            .flag_if(self.files_with_matches, "--files-with-matches")
            .opt_value("--context", self.context)
            .opt_value("--max-count", self.max_count)
            .opt_value("--max-depth", self.max_depth);
        for file_type in &self.file_types {
            args.value("--type", file_type);
        }
        for glob in &self.globs {
            args.value("--glob", glob);
        }
        args.flag("--").raw(self.pattern.clone());
        for path in &self.paths {
            args.raw(path.to_arg());
        }
        args.finish(AllowedCommand::Rg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::{assert_valid, path, sandbox};

    #[test]
    fn pattern_follows_the_end_of_flags_marker() {
        let (_dir, sandbox) = sandbox();
        let src = path(&sandbox, "src");
        let line = RipgrepQuery::new("-starts-with-dash")
            .ignore_case(true)
            .glob("*.rs")
            .context(2)
            .path(src.clone())
            .build();

        assert_eq!(line.command(), AllowedCommand::Rg);
        let args = line.args();
        let marker = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[marker + 1], "-starts-with-dash");
        assert_eq!(args[marker + 2], src.to_arg());
        assert!(args[..marker].contains(&"--ignore-case".to_string()));
        assert_valid(&line);
    }

    #[test]
    fn regex_patterns_survive_validation() {
        let line = RipgrepQuery::new(r"fn\s+(new|build)\(").file_type("rust").build();
        assert_valid(&line);
    }
}
