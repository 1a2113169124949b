//! Command Validator Property Tests
//!
//! Exercises the validator through its public API:
//! - NUL bytes are rejected for every command in every argument position
//! - Unknown commands are rejected before anything else
//! - Destructive locator operators are rejected wherever they appear
//! - Regex punctuation is accepted as a pattern and rejected as a path
//! - Validation is deterministic

use delve_core::{
    AllowedCommand, CommandValidator, FailureClass, PolicyTable, RejectionKind, SecurityConfig,
};
use std::sync::Arc;

fn validator() -> CommandValidator {
    CommandValidator::new(Arc::new(PolicyTable::builtin()))
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rejection_kind(command: &str, items: &[&str]) -> Option<RejectionKind> {
    validator()
        .validate(command, &args(items))
        .rejection()
        .map(|r| r.kind)
}

/// One valid argument vector per command, with a position for each role.
fn valid_lines() -> Vec<(AllowedCommand, Vec<&'static str>)> {
    vec![
        (AllowedCommand::Rg, vec!["-g", "*.rs", "-m", "5", "needle", "src"]),
        (AllowedCommand::Grep, vec!["-r", "--include", "*.c", "main", "src"]),
        (
            AllowedCommand::Find,
            vec![".", "(", "-name", "*.rs", ")", "-maxdepth", "2"],
        ),
        (AllowedCommand::Ls, vec!["-l", "-a", "--sort", "size", "src"]),
        (AllowedCommand::Git, vec!["log", "-n", "3", "--grep", "fix", "--", "src"]),
        (AllowedCommand::Npm, vec!["view", "--depth", "0", "left-pad"]),
    ]
}

// ============================================================================
// Baseline
// ============================================================================

#[test]
fn test_baseline_lines_are_valid() {
    for (command, line) in valid_lines() {
        assert_eq!(rejection_kind(command.name(), &line), None, "{command} {line:?}");
    }
}

// ============================================================================
// NUL bytes
// ============================================================================

#[test]
fn test_nul_byte_is_rejected_in_every_position() {
    for (command, line) in valid_lines() {
        for index in 0..line.len() {
            let mut tampered = args(&line);
            tampered[index].push('\0');
            let outcome = validator().validate(command.name(), &tampered);
            assert!(
                !outcome.is_valid(),
                "{command}: NUL accepted at position {index} of {line:?}"
            );
        }
    }
}

#[test]
fn test_nul_byte_alone_is_rejected_in_every_position() {
    for (command, line) in valid_lines() {
        for index in 0..line.len() {
            let mut tampered = args(&line);
            tampered[index] = "\0".to_string();
            assert!(
                !validator().validate(command.name(), &tampered).is_valid(),
                "{command}: lone NUL accepted at position {index}"
            );
        }
    }
}

// ============================================================================
// Allowlist
// ============================================================================

#[test]
fn test_unknown_commands_are_rejected_first() {
    for command in ["bash", "sh", "python", "curl", "rm", "/usr/bin/rg", "RG", " rg", "rg\0"] {
        assert_eq!(
            rejection_kind(command, &["-delete", "$(id)"]),
            Some(RejectionKind::UnknownCommand),
            "{command:?}"
        );
    }
}

#[test]
fn test_unknown_command_message_is_escaped() {
    let outcome = validator().validate("evil\ncommand", &[]);
    let rejection = outcome.rejection().unwrap();
    assert!(!rejection.message.contains('\n'));
    assert_eq!(rejection.class(), FailureClass::PolicyViolation);
}

#[test]
fn test_disabled_command_is_rejected() {
    let config = SecurityConfig::from_json_str(r#"{"commands": {"npm": {"enabled": false}}}"#)
        .unwrap();
    let validator = CommandValidator::new(Arc::new(config.policy_table()));
    let outcome = validator.validate("npm", &args(&["view", "left-pad"]));
    assert_eq!(
        outcome.rejection().map(|r| r.kind),
        Some(RejectionKind::CommandDisabled)
    );
}

// ============================================================================
// Locator operators
// ============================================================================

#[test]
fn test_find_operators_rejected_in_any_position() {
    let operators = [
        "-delete", "-exec", "-execdir", "-ok", "-okdir", "-fprint", "-fprint0", "-fprintf", "-fls",
        "-printf",
    ];
    for op in operators {
        assert_eq!(
            rejection_kind("find", &[op]),
            Some(RejectionKind::DisallowedOperator),
            "{op} as first token"
        );
        assert_eq!(
            rejection_kind("find", &[".", "-name", "*.rs", op]),
            Some(RejectionKind::DisallowedOperator),
            "{op} after expression"
        );
        assert_eq!(
            rejection_kind("find", &[".", "-name", op]),
            Some(RejectionKind::DisallowedOperator),
            "{op} as a value"
        );
        let inline = format!("{op}=x");
        assert_eq!(
            rejection_kind("find", &[".", &inline]),
            Some(RejectionKind::DisallowedOperator),
            "{inline}"
        );
    }
}

#[test]
fn test_find_exec_with_shell_is_rejected() {
    assert_eq!(
        rejection_kind("find", &[".", "-exec", "sh", "-c", "id", ";"]),
        Some(RejectionKind::DisallowedOperator)
    );
}

// ============================================================================
// Flags
// ============================================================================

#[test]
fn test_flags_that_spawn_programs_are_rejected() {
    let cases: &[(&str, &[&str])] = &[
        ("rg", &["--pre", "cat", "x"]),
        ("rg", &["--pre=cat", "x"]),
        ("rg", &["-z", "x"]),
        ("git", &["log", "--ext-diff"]),
        ("git", &["log", "--output=/tmp/x"]),
        ("grep", &["-f", "patterns.txt", "src"]),
        ("find", &["-L", "."]),
    ];
    for (command, line) in cases {
        assert_eq!(
            rejection_kind(command, line),
            Some(RejectionKind::DisallowedFlag),
            "{command} {line:?}"
        );
    }
}

#[test]
fn test_write_subcommands_are_rejected() {
    for (command, sub) in [("git", "push"), ("git", "commit"), ("npm", "install"), ("npm", "exec")]
    {
        assert_eq!(
            rejection_kind(command, &[sub]),
            Some(RejectionKind::DisallowedSubcommand),
            "{command} {sub}"
        );
    }
}

// ============================================================================
// Pattern vs path
// ============================================================================

#[test]
fn test_parentheses_accepted_as_pattern_rejected_as_path() {
    assert_eq!(rejection_kind("rg", &["(foo|bar)", "src"]), None);
    assert_eq!(
        rejection_kind("rg", &["needle", "(foo|bar)"]),
        Some(RejectionKind::DangerousContent)
    );
    assert_eq!(
        rejection_kind("ls", &["(foo|bar)"]),
        Some(RejectionKind::DangerousContent)
    );
}

#[test]
fn test_substitution_is_rejected_even_as_pattern() {
    for pattern in ["$(id)", "`id`", "${HOME}", "a;b", "a && b", "x > y"] {
        assert_eq!(
            rejection_kind("rg", &[pattern, "src"]),
            Some(RejectionKind::DangerousContent),
            "{pattern:?}"
        );
    }
}

#[test]
fn test_content_rejection_names_index_and_rule_only() {
    let outcome = validator().validate("ls", &args(&["-l", "src;cat /etc/shadow"]));
    let rejection = outcome.rejection().unwrap();
    assert_eq!(rejection.class(), FailureClass::ContentRejected);
    assert!(rejection.message.contains("#1"));
    assert!(!rejection.message.contains("shadow"));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_validation_is_idempotent() {
    let v = validator();
    let inputs: Vec<(&str, Vec<String>)> = vec![
        ("rg", args(&["-i", "(a|b)", "src"])),
        ("rg", args(&["x", "$(id)"])),
        ("find", args(&[".", "-delete"])),
        ("bash", args(&[])),
        ("git", args(&["push"])),
    ];
    for (command, line) in inputs {
        let first = v.validate(command, &line);
        for _ in 0..3 {
            assert_eq!(v.validate(command, &line), first);
        }
    }
}

#[test]
fn test_validator_is_shareable_across_threads() {
    let v = validator();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let v = v.clone();
            std::thread::spawn(move || v.validate("rg", &args(&["needle", "src"])).is_valid())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
