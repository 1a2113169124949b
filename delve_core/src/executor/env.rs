//! Child-process environment.
//!
//! The parent environment is never inherited wholesale. Only the variables below
//! are copied through, so tool configuration hooks such as `RIPGREP_CONFIG_PATH`,
//! `GREP_OPTIONS`, `GIT_DIR` or `NODE_OPTIONS` never reach the child.

use crate::policy::AllowedCommand;

/// Variables copied from the parent environment when set.
pub const ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LOGNAME",
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "LC_MESSAGES",
    "TZ",
    "TMPDIR",
];

const COMMON_HARDENING: &[(&str, &str)] = &[("NO_COLOR", "1")];

const GIT_HARDENING: &[(&str, &str)] = &[
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_PAGER", "cat"),
    ("PAGER", "cat"),
    ("GIT_OPTIONAL_LOCKS", "0"),
];

const NPM_HARDENING: &[(&str, &str)] = &[
    ("NPM_CONFIG_UPDATE_NOTIFIER", "false"),
    ("NPM_CONFIG_FUND", "false"),
    ("NPM_CONFIG_AUDIT", "false"),
];

/// Fixed variables set for `command` on top of the allowlisted ones.
pub fn hardening(command: AllowedCommand) -> &'static [(&'static str, &'static str)] {
    match command {
        AllowedCommand::Git => GIT_HARDENING,
        AllowedCommand::Npm => NPM_HARDENING,
        AllowedCommand::Rg | AllowedCommand::Grep | AllowedCommand::Find | AllowedCommand::Ls => {
            &[]
        }
    }
}

/// The complete environment for a child running `command`, given the parent's
/// variables.
pub fn child_environment<I>(command: AllowedCommand, parent: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: Vec<(String, String)> = parent
        .into_iter()
        .filter(|(key, _)| ENV_ALLOWLIST.contains(&key.as_str()))
        .collect();
    env.sort();

    for (key, value) in COMMON_HARDENING.iter().chain(hardening(command)) {
        env.retain(|(existing, _)| existing != key);
        env.push(((*key).to_string(), (*value).to_string()));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> Vec<(String, String)> {
        [
            ("PATH", "/usr/bin"),
            ("HOME", "/home/u"),
            ("RIPGREP_CONFIG_PATH", "/tmp/evil"),
            ("GIT_DIR", "/tmp/evil.git"),
            ("LD_PRELOAD", "/tmp/evil.so"),
            ("PAGER", "less"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn only_allowlisted_variables_pass() {
        let env = child_environment(AllowedCommand::Rg, parent());
        assert_eq!(lookup(&env, "PATH"), Some("/usr/bin"));
        assert_eq!(lookup(&env, "HOME"), Some("/home/u"));
        assert_eq!(lookup(&env, "RIPGREP_CONFIG_PATH"), None);
        assert_eq!(lookup(&env, "LD_PRELOAD"), None);
        assert_eq!(lookup(&env, "NO_COLOR"), Some("1"));
    }

    #[test]
    fn git_gets_its_hardening() {
        let env = child_environment(AllowedCommand::Git, parent());
        assert_eq!(lookup(&env, "GIT_TERMINAL_PROMPT"), Some("0"));
        assert_eq!(lookup(&env, "GIT_CONFIG_NOSYSTEM"), Some("1"));
        assert_eq!(lookup(&env, "GIT_PAGER"), Some("cat"));
        assert_eq!(lookup(&env, "PAGER"), Some("cat"));
        assert_eq!(lookup(&env, "GIT_DIR"), None);
        assert_eq!(env.iter().filter(|(k, _)| k == "PAGER").count(), 1);
    }
}
