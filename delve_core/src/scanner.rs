//! # Dangerous-Content Scanner
//!
//! Matches a single argument against one of two ordered rule sets:
//!
//! - **`RuleSet::Strict`** for paths, flags, flag values: rejects every shell
//!   metacharacter, expansion trigger and escape sequence, plus leading-dash
//!   tokens in positional slots.
//! - **`RuleSet::PatternPermissive`** for search patterns and grouping tokens:
//!   the same substitution, separator, redirection and control-character rules,
//!   but the regex/glob punctuation `( ) | [ ] { } * ? . ^ $` is allowed.
//!
//! Permissiveness only widens the punctuation allowance. The null byte and every
//! substitution primitive are rejected by both sets.

use regex::Regex;
use std::sync::OnceLock;

/// Which rule set to scan with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSet {
    Strict,
    PatternPermissive,
}

/// One named dangerous-content rule.
#[derive(Debug)]
pub struct DangerousPattern {
    pub name: &'static str,
    pub description: &'static str,
    regex: Regex,
    /// Applies only to positional tokens, never to a flag's own name.
    positional_only: bool,
}

impl DangerousPattern {
    fn new(
        name: &'static str,
        description: &'static str,
        pattern: &str,
        positional_only: bool,
    ) -> Self {
        Self {
            name,
            description,
            regex: Regex::new(pattern).expect("dangerous-content rule must compile"),
            positional_only,
        }
    }

    pub fn is_match(&self, arg: &str) -> bool {
        self.regex.is_match(arg)
    }
}

/// Rules shared by both sets. Order is the reporting order.
fn shared_rules() -> Vec<DangerousPattern> {
    vec![
        DangerousPattern::new("null_byte", "embedded NUL byte", r"\x00", false),
        DangerousPattern::new("command_substitution", "$( ) command substitution", r"\$\(", false),
        DangerousPattern::new("backtick", "backtick command substitution", r"`", false),
        DangerousPattern::new("parameter_expansion", "${ } parameter expansion", r"\$\{", false),
        DangerousPattern::new("ansi_c_quoting", "$'...' ANSI-C quoting", r"\$'", false),
        DangerousPattern::new("process_substitution", "<( ) or >( ) process substitution", r"[<>]\(", false),
        DangerousPattern::new("line_break", "newline or carriage return", r"[\r\n]", false),
        DangerousPattern::new("command_separator", "';' command separator", r";", false),
        DangerousPattern::new("logical_and", "'&&' command chaining", r"&&", false),
        DangerousPattern::new("logical_or", "'||' command chaining", r"\|\|", false),
        DangerousPattern::new("redirection", "'<' or '>' redirection", r"[<>]", false),
    ]
}

/// Rules that only the strict set carries.
fn strict_only_rules() -> Vec<DangerousPattern> {
    vec![
        DangerousPattern::new("pipe", "'|' pipeline", r"\|", false),
        DangerousPattern::new("background", "'&' background operator", r"&", false),
        DangerousPattern::new("variable_expansion", "$NAME variable expansion", r"\$[A-Za-z_0-9@*#?!$-]", false),
        DangerousPattern::new("subshell", "'(' or ')' subshell grouping", r"[()]", false),
        DangerousPattern::new("brace_expansion", "{a,b} or {1..9} brace expansion", r"\{[^}]*(,|\.\.)[^}]*\}", false),
        DangerousPattern::new("glob", "'*', '?', '[' or ']' glob expansion", r"[*?\[\]]", false),
        DangerousPattern::new("escape_sequence", "hex or octal escape sequence", r"\\(x[0-9A-Fa-f]{1,2}|[0-7]{3})", false),
        DangerousPattern::new("leading_dash", "leading '-' in a positional slot", r"^-", true),
    ]
}

fn strict_rules() -> &'static [DangerousPattern] {
    static RULES: OnceLock<Vec<DangerousPattern>> = OnceLock::new();
    RULES.get_or_init(|| {
        let mut rules = shared_rules();
        rules.extend(strict_only_rules());
        rules
    })
}

fn permissive_rules() -> &'static [DangerousPattern] {
    static RULES: OnceLock<Vec<DangerousPattern>> = OnceLock::new();
    RULES.get_or_init(shared_rules)
}

impl RuleSet {
    pub fn rules(self) -> &'static [DangerousPattern] {
        match self {
            RuleSet::Strict => strict_rules(),
            RuleSet::PatternPermissive => permissive_rules(),
        }
    }
}

/// First rule of `rule_set` matching a positional argument.
pub fn scan(arg: &str, rule_set: RuleSet) -> Option<&'static DangerousPattern> {
    rule_set.rules().iter().find(|rule| rule.is_match(arg))
}

/// First rule of `rule_set` matching a flag token (positional-only rules skipped).
pub fn scan_flag(arg: &str, rule_set: RuleSet) -> Option<&'static DangerousPattern> {
    rule_set
        .rules()
        .iter()
        .filter(|rule| !rule.positional_only)
        .find(|rule| rule.is_match(arg))
}
