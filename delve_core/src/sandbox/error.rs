use crate::error::FailureClass;
use std::path::PathBuf;

/// Errors specific to sandbox operations
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Path must not be empty")]
    EmptyPath,

    #[error("Path contains a NUL byte")]
    NullByte,

    #[error("Path is not valid UTF-8")]
    NotUtf8,

    #[error("Cannot expand '~': home directory is unknown")]
    HomeUnavailable,

    #[error("No sandbox roots configured")]
    NoRoots,

    #[error("Invalid sandbox root '{root:?}': {reason}")]
    InvalidRoot { root: PathBuf, reason: String },

    #[error("Path '{path:?}' is outside the sandbox root{}", format_roots(.roots))]
    OutsideSandbox { path: PathBuf, roots: Vec<PathBuf> },

    #[error("Path '{path:?}' exists but cannot be resolved: {reason}")]
    Unresolvable { path: PathBuf, reason: String },

    #[error("Working directory '{path:?}' is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Working directory '{path:?}' does not exist")]
    MissingWorkingDir { path: PathBuf },

    #[error("Path '{path:?}' changed after it was validated")]
    PathChanged { path: PathBuf },

    #[error("Failed to open '{path:?}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SandboxError {
    pub fn class(&self) -> FailureClass {
        FailureClass::PathRejected
    }
}

/// Format sandbox roots for error messages
pub(crate) fn format_roots(roots: &[PathBuf]) -> String {
    match roots {
        [] => " (none configured)".to_string(),
        [root] => format!(" '{}'", root.display()),
        _ => {
            let list: Vec<String> = roots
                .iter()
                .map(|root| format!("'{}'", root.display()))
                .collect();
            format!("s [{}]", list.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_are_listed_in_outside_errors() {
        let err = SandboxError::OutsideSandbox {
            path: PathBuf::from("/etc/passwd"),
            roots: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        let text = err.to_string();
        assert!(text.contains("roots ['/a', '/b']"), "{text}");
        assert_eq!(err.class(), FailureClass::PathRejected);
    }

    #[test]
    fn missing_working_dir_is_a_path_rejection() {
        let err = SandboxError::MissingWorkingDir {
            path: PathBuf::from("/sandbox/not-yet"),
        };
        assert!(err.to_string().contains("does not exist"));
        assert_eq!(err.class(), FailureClass::PathRejected);
    }

    #[test]
    fn empty_root_list_is_explicit() {
        assert_eq!(format_roots(&[]), " (none configured)");
    }
}
