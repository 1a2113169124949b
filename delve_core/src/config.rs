//! # Security Configuration
//!
//! The on-disk description of a deployment: which directories form the sandbox,
//! the default execution budgets, the argument-vector bounds, and per-command
//! narrowing of the builtin policy.
//!
//! ```json
//! {
//!   "sandbox_roots": ["/home/user/project"],
//!   "limits": { "timeout_ms": 10000, "max_output_bytes": 1048576 },
//!   "commands": {
//!     "npm": { "enabled": false },
//!     "rg": { "deny_flags": ["--hidden", "-u"] },
//!     "git": { "deny_subcommands": ["blame"] }
//!   }
//! }
//! ```
//!
//! Configuration only ever narrows. There is deliberately no field that adds a
//! flag, adds a subcommand, or lifts a disallowed locator operator.

use crate::executor::ExecutionLimits;
use crate::policy::{AllowedCommand, PolicyTable};
use crate::validator::ArgumentLimits;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "security.json";

/// Complete security configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Directories every path argument and working directory must resolve inside.
    /// The first root is where relative paths are resolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sandbox_roots: Vec<PathBuf>,
    /// Default wall-clock and output budgets for each execution.
    #[serde(default)]
    pub limits: ExecutionLimits,
    /// Bounds on argument count and per-argument length.
    #[serde(default)]
    pub argument_limits: ArgumentLimits,
    /// Per-command narrowing of the builtin policy.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<AllowedCommand, CommandOverride>,
}

/// Narrowing applied to one allowlisted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CommandOverride {
    /// Set to `false` to refuse the command entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Binary to spawn instead of resolving the command name through `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// Builtin flags to remove from the command's allowlist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_flags: Vec<String>,
    /// Builtin read-only subcommands to remove (git and npm only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_subcommands: Vec<String>,
}

impl Default for CommandOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: None,
            deny_flags: Vec::new(),
            deny_subcommands: Vec::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl SecurityConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid security configuration")
    }

    /// Load a configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config = Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            roots = config.sandbox_roots.len(),
            overrides = config.commands.len(),
            "loaded security configuration"
        );
        Ok(config)
    }

    /// Load `path` when given, else the platform default file when it exists,
    /// else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match default_config_path() {
            Some(default) if default.is_file() => Self::load_from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    /// The builtin policy table narrowed by this configuration.
    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable::with_overrides(&self.commands)
    }

    /// Every problem found in this configuration. An empty list means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for root in &self.sandbox_roots {
            if root.as_os_str().is_empty() {
                problems.push("sandbox root must not be empty".to_string());
            } else if !root.is_absolute() && !root.starts_with("~") {
                problems.push(format!(
                    "sandbox root '{}' must be absolute",
                    root.display()
                ));
            } else if root == Path::new("/") {
                problems.push("'/' is not a valid sandbox root".to_string());
            }
        }

        if self.limits.timeout_ms == 0 {
            problems.push("limits.timeout_ms must be greater than zero".to_string());
        }
        if self.limits.max_output_bytes == 0 {
            problems.push("limits.max_output_bytes must be greater than zero".to_string());
        }
        if self.argument_limits.max_args == 0 {
            problems.push("argument_limits.max_args must be greater than zero".to_string());
        }
        if self.argument_limits.max_arg_len == 0 {
            problems.push("argument_limits.max_arg_len must be greater than zero".to_string());
        }

        let builtin = PolicyTable::builtin();
        for (command, over) in &self.commands {
            let policy = builtin.policy(*command);
            for flag in &over.deny_flags {
                if !policy.knows_flag(flag) {
                    problems.push(format!("{command}: '{flag}' is not a builtin flag"));
                }
            }
            for subcommand in &over.deny_subcommands {
                if !policy.requires_subcommand() {
                    problems.push(format!("{command}: has no subcommand allowlist"));
                    break;
                }
                if !policy.allows_subcommand(subcommand) {
                    problems.push(format!(
                        "{command}: '{subcommand}' is not a builtin subcommand"
                    ));
                }
            }
            if let Some(binary) = &over.binary
                && !binary.is_absolute()
                && binary.components().count() != 1
            {
                problems.push(format!(
                    "{command}: binary '{}' must be a bare name or an absolute path",
                    binary.display()
                ));
            }
        }

        problems
    }

    /// JSON schema of the configuration file format.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(SecurityConfig)).unwrap_or_default()
    }
}

/// Platform default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "Delve", "delve").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default() {
        let config = SecurityConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SecurityConfig::default());
        assert_eq!(config.limits.timeout_ms, 30_000);
        assert_eq!(config.limits.max_output_bytes, 10 * 1024 * 1024);
        assert_eq!(config.argument_limits.max_args, 256);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(SecurityConfig::from_json_str(r#"{"allow_flags": {}}"#).is_err());
        assert!(
            SecurityConfig::from_json_str(r#"{"commands": {"rg": {"allow_flags": ["--pre"]}}}"#)
                .is_err()
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(SecurityConfig::from_json_str(r#"{"commands": {"bash": {}}}"#).is_err());
    }

    #[test]
    fn overrides_parse_with_defaults() {
        let config = SecurityConfig::from_json_str(
            r#"{"commands": {"rg": {"deny_flags": ["--hidden"]}, "npm": {"enabled": false}}}"#,
        )
        .unwrap();
        let rg = &config.commands[&AllowedCommand::Rg];
        assert!(rg.enabled);
        assert_eq!(rg.deny_flags, vec!["--hidden".to_string()]);
        assert!(!config.commands[&AllowedCommand::Npm].enabled);

        let table = config.policy_table();
        assert!(!table.policy(AllowedCommand::Rg).knows_flag("--hidden"));
        assert!(!table.policy(AllowedCommand::Npm).is_enabled());
    }

    #[test]
    fn validate_reports_each_problem() {
        let config = SecurityConfig::from_json_str(
            r#"{
                "sandbox_roots": ["/", "relative/dir"],
                "limits": {"timeout_ms": 0},
                "commands": {
                    "rg": {"deny_flags": ["--made-up"], "binary": "bin/rg"},
                    "ls": {"deny_subcommands": ["x"]},
                    "git": {"deny_subcommands": ["push"]}
                }
            }"#,
        )
        .unwrap();
        let problems = config.validate();
        assert_eq!(problems.len(), 7, "{problems:#?}");
        assert!(problems.iter().any(|p| p.contains("'/'")));
        assert!(problems.iter().any(|p| p.contains("relative/dir")));
        assert!(problems.iter().any(|p| p.contains("timeout_ms")));
        assert!(problems.iter().any(|p| p.contains("--made-up")));
        assert!(problems.iter().any(|p| p.contains("bin/rg")));
        assert!(problems.iter().any(|p| p.starts_with("ls:")));
        assert!(problems.iter().any(|p| p.contains("push")));
    }

    #[test]
    fn load_from_file_names_the_file_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SecurityConfig::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn schema_mentions_every_section() {
        let schema = SecurityConfig::json_schema().to_string();
        for field in ["sandbox_roots", "limits", "argument_limits", "commands", "deny_flags"] {
            assert!(schema.contains(field), "{field}");
        }
    }
}
