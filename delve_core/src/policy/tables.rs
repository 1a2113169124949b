//! Builtin flag tables.
//!
//! Flags that spawn other programs, follow symlinks out of the searched tree,
//! read pattern lists from arbitrary files, or write files are deliberately
//! absent: an unknown flag is rejected, so leaving a flag out is how it is
//! forbidden. Examples: `rg --pre/--pre-glob/-z/-L/-f`, `grep -R/-f`,
//! `find -L/-H/-follow`, `git -c/-C/--ext-diff/--textconv/--output/-O`.

use super::{AllowedCommand, CommandPolicy};
use std::collections::BTreeSet;
use std::path::PathBuf;

const RG_BARE: &[&str] = &[
    "-i",
    "--ignore-case",
    "-s",
    "--case-sensitive",
    "-S",
    "--smart-case",
    "-F",
    "--fixed-strings",
    "-w",
    "--word-regexp",
    "-x",
    "--line-regexp",
    "-v",
    "--invert-match",
    "-n",
    "--line-number",
    "-N",
    "--no-line-number",
    "-l",
    "--files-with-matches",
    "--files-without-match",
    "-c",
    "--count",
    "--count-matches",
    "-o",
    "--only-matching",
    "-U",
    "--multiline",
    "--multiline-dotall",
    "-P",
    "--pcre2",
    "--hidden",
    "--no-ignore",
    "--no-ignore-vcs",
    "--no-ignore-parent",
    "-u",
    "--unrestricted",
    "--files",
    "--json",
    "--heading",
    "--no-heading",
    "-H",
    "--with-filename",
    "-I",
    "--no-filename",
    "--column",
    "--vimgrep",
    "--trim",
    "--stats",
    "--null",
    "-a",
    "--text",
    "-q",
    "--quiet",
    "--no-messages",
    "--no-config",
];
const RG_VALUE: &[&str] = &[
    "-A",
    "--after-context",
    "-B",
    "--before-context",
    "-C",
    "--context",
    "-m",
    "--max-count",
    "-d",
    "--max-depth",
    "--max-filesize",
    "-M",
    "--max-columns",
    "-t",
    "--type",
    "-T",
    "--type-not",
    "--sort",
    "--sortr",
    "--color",
    "-E",
    "--encoding",
    "-g",
    "--glob",
    "--iglob",
    "-e",
    "--regexp",
];
const RG_PATTERN: &[&str] = &["-g", "--glob", "--iglob", "-e", "--regexp"];

const GREP_BARE: &[&str] = &[
    "-r",
    "--recursive",
    "-i",
    "--ignore-case",
    "-v",
    "--invert-match",
    "-w",
    "--word-regexp",
    "-x",
    "--line-regexp",
    "-n",
    "--line-number",
    "-l",
    "--files-with-matches",
    "-L",
    "--files-without-match",
    "-c",
    "--count",
    "-o",
    "--only-matching",
    "-s",
    "--no-messages",
    "-q",
    "--quiet",
    "-H",
    "--with-filename",
    "-h",
    "--no-filename",
    "-E",
    "--extended-regexp",
    "-F",
    "--fixed-strings",
    "-G",
    "--basic-regexp",
    "-P",
    "--perl-regexp",
    "-I",
    "-a",
    "--text",
    "-Z",
    "--null",
];
const GREP_VALUE: &[&str] = &[
    "-A",
    "--after-context",
    "-B",
    "--before-context",
    "-C",
    "--context",
    "-m",
    "--max-count",
    "--color",
    "--colour",
    "--binary-files",
    "-e",
    "--regexp",
    "--include",
    "--exclude",
    "--exclude-dir",
];
const GREP_PATTERN: &[&str] = &["-e", "--regexp", "--include", "--exclude", "--exclude-dir"];

const FIND_BARE: &[&str] = &[
    "-P",
    "-empty",
    "-print",
    "-print0",
    "-prune",
    "-quit",
    "-xdev",
    "-mount",
    "-depth",
    "-true",
    "-false",
    "-readable",
    "-writable",
    "-executable",
    "-nouser",
    "-nogroup",
    "-ls",
    "-daystart",
    "-noleaf",
];
const FIND_VALUE: &[&str] = &[
    "-name",
    "-iname",
    "-path",
    "-ipath",
    "-wholename",
    "-iwholename",
    "-regex",
    "-iregex",
    "-regextype",
    "-type",
    "-xtype",
    "-maxdepth",
    "-mindepth",
    "-size",
    "-perm",
    "-mtime",
    "-mmin",
    "-atime",
    "-amin",
    "-ctime",
    "-cmin",
    "-newer",
    "-samefile",
    "-user",
    "-group",
    "-uid",
    "-gid",
    "-links",
    "-inum",
];
const FIND_PATTERN: &[&str] = &[
    "-name",
    "-iname",
    "-path",
    "-ipath",
    "-wholename",
    "-iwholename",
    "-regex",
    "-iregex",
    "-size",
    "-perm",
    "-mtime",
    "-mmin",
    "-atime",
    "-amin",
    "-ctime",
    "-cmin",
];
const FIND_PATH: &[&str] = &["-newer", "-samefile"];
const FIND_DISALLOWED: &[&str] = &[
    "-delete", "-exec", "-execdir", "-ok", "-okdir", "-fprint", "-fprint0", "-fprintf", "-fls",
    "-printf",
];

const LS_BARE: &[&str] = &[
    "-a",
    "--all",
    "-A",
    "--almost-all",
    "-l",
    "-h",
    "--human-readable",
    "-R",
    "--recursive",
    "-1",
    "-t",
    "-S",
    "-r",
    "--reverse",
    "-d",
    "--directory",
    "-F",
    "--classify",
    "-p",
    "-i",
    "--inode",
    "-s",
    "--size",
    "-n",
    "--numeric-uid-gid",
    "--group-directories-first",
    "--full-time",
];
const LS_VALUE: &[&str] = &[
    "--sort",
    "--time-style",
    "--color",
    "--format",
    "-I",
    "--ignore",
    "--hide",
];
const LS_PATTERN: &[&str] = &["-I", "--ignore", "--hide"];

const GIT_SUBCOMMANDS: &[&str] = &[
    "log",
    "show",
    "diff",
    "status",
    "blame",
    "ls-files",
    "ls-tree",
    "rev-parse",
    "shortlog",
    "grep",
    "describe",
    "cat-file",
];
const GIT_BARE: &[&str] = &[
    "--no-pager",
    "--oneline",
    "--stat",
    "--shortstat",
    "--numstat",
    "--name-only",
    "--name-status",
    "-p",
    "--patch",
    "--no-patch",
    "-s",
    "--graph",
    "--decorate",
    "--no-decorate",
    "--all",
    "--reverse",
    "--first-parent",
    "--no-merges",
    "--merges",
    "--abbrev-commit",
    "--follow",
    "--full-history",
    "--date-order",
    "--topo-order",
    "--cached",
    "--staged",
    "--short",
    "--porcelain",
    "--branch",
    "-b",
    "-w",
    "--ignore-all-space",
    "--no-color",
    "--no-ext-diff",
    "--no-textconv",
    "--no-renames",
    "-z",
    "-r",
    "-t",
    "-l",
    "-i",
    "--ignore-case",
    "--line-number",
    "--count",
    "--tags",
    "--always",
    "--show-toplevel",
    "--abbrev-ref",
];
const GIT_VALUE: &[&str] = &[
    "-n",
    "--max-count",
    "--skip",
    "--since",
    "--after",
    "--until",
    "--before",
    "--author",
    "--committer",
    "--grep",
    "-S",
    "-G",
    "-e",
    "--format",
    "--pretty",
    "--date",
    "--diff-filter",
    "-U",
    "--unified",
    "-L",
    "--abbrev",
    "--untracked-files",
];
const GIT_PATTERN: &[&str] = &["--author", "--committer", "--grep", "-S", "-G", "-e"];
/// `git grep` takes its pattern positionally and uses `-n` for line numbers.
const GIT_PATTERN_SUBCOMMANDS: &[&str] = &["grep"];
const GIT_SUBCOMMAND_BARE: &[(&str, &[&str])] = &[("grep", &["-n"])];

const NPM_SUBCOMMANDS: &[&str] = &[
    "view", "info", "show", "search", "ls", "list", "outdated", "explain", "why",
];
const NPM_BARE: &[&str] = &[
    "--json",
    "-l",
    "--long",
    "-a",
    "--all",
    "-p",
    "--parseable",
    "-g",
    "--global",
    "--prod",
    "--production",
    "--dev",
];
const NPM_VALUE: &[&str] = &["--depth", "--omit", "--searchlimit"];

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

pub(super) fn builtin(command: AllowedCommand) -> CommandPolicy {
    let (bare, value, pattern, path, disallowed, subcommands): (
        &[&str],
        &[&str],
        &[&str],
        &[&str],
        &[&str],
        Option<&[&str]>,
    ) = match command {
        AllowedCommand::Rg => (RG_BARE, RG_VALUE, RG_PATTERN, &[], &[], None),
        AllowedCommand::Grep => (GREP_BARE, GREP_VALUE, GREP_PATTERN, &[], &[], None),
        AllowedCommand::Find => (
            FIND_BARE,
            FIND_VALUE,
            FIND_PATTERN,
            FIND_PATH,
            FIND_DISALLOWED,
            None,
        ),
        AllowedCommand::Ls => (LS_BARE, LS_VALUE, LS_PATTERN, &[], &[], None),
        AllowedCommand::Git => (
            GIT_BARE,
            GIT_VALUE,
            GIT_PATTERN,
            &[],
            &[],
            Some(GIT_SUBCOMMANDS),
        ),
        AllowedCommand::Npm => (NPM_BARE, NPM_VALUE, &[], &[], &[], Some(NPM_SUBCOMMANDS)),
    };

    let (subcommand_bare, pattern_subcommands): (&[(&str, &[&str])], &[&str]) = match command {
        AllowedCommand::Git => (GIT_SUBCOMMAND_BARE, GIT_PATTERN_SUBCOMMANDS),
        _ => (&[], &[]),
    };

    CommandPolicy {
        command,
        binary: PathBuf::from(command.name()),
        enabled: true,
        bare_flags: set(bare),
        value_flags: set(value),
        pattern_flags: set(pattern),
        path_flags: set(path),
        disallowed_operators: set(disallowed),
        subcommands: subcommands.map(set),
        subcommand_bare: subcommand_bare
            .iter()
            .map(|(name, flags)| ((*name).to_string(), set(flags)))
            .collect(),
        pattern_subcommands: set(pattern_subcommands),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_and_path_flags_are_value_flags() {
        for command in AllowedCommand::ALL {
            let policy = builtin(command);
            assert!(policy.pattern_flags.is_subset(&policy.value_flags), "{command}");
            assert!(policy.path_flags.is_subset(&policy.value_flags), "{command}");
            assert!(policy.bare_flags.is_disjoint(&policy.value_flags), "{command}");
        }
    }

    #[test]
    fn dangerous_flags_are_absent() {
        let rg = builtin(AllowedCommand::Rg);
        for flag in ["--pre", "--pre-glob", "-z", "--search-zip", "-L", "--follow", "-f"] {
            assert!(!rg.knows_flag(flag), "rg {flag}");
        }
        let find = builtin(AllowedCommand::Find);
        for flag in ["-L", "-H", "-follow"] {
            assert!(!find.knows_flag(flag), "find {flag}");
        }
        let git = builtin(AllowedCommand::Git);
        for flag in ["-c", "-C", "--ext-diff", "--textconv", "--output", "-O", "--git-dir"] {
            assert!(!git.knows_flag(flag), "git {flag}");
        }
    }

    #[test]
    fn git_grep_line_numbers_take_no_value() {
        let git = builtin(AllowedCommand::Git);
        assert!(git.is_value_flag_in("-n", Some("log")));
        assert!(!git.is_value_flag_in("-n", Some("grep")));
        assert!(git.is_bare_flag_in("-n", Some("grep")));
        assert_eq!(git.value_role_in("-n", Some("grep")), None);
        assert!(git.takes_positional_pattern("grep"));
        assert!(!git.takes_positional_pattern("log"));
    }

    #[test]
    fn disallowed_operators_are_not_flags() {
        let find = builtin(AllowedCommand::Find);
        for op in FIND_DISALLOWED {
            assert!(!find.knows_flag(op));
        }
    }
}
