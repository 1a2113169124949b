use std::fmt;
use std::path::{Path, PathBuf};

use super::error::SandboxError;

/// A path that resolved inside the sandbox. Only [`super::Sandbox`] creates these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxedPath(PathBuf);

impl SandboxedPath {
    pub(super) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// The path as a single argv element. Resolution guarantees UTF-8.
    pub fn to_arg(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl AsRef<Path> for SandboxedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SandboxedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.display(), f)
    }
}

/// Outcome of validating one candidate path.
#[derive(Debug)]
pub struct PathValidation {
    pub is_valid: bool,
    /// The resolved path to use in place of the candidate.
    pub sanitized_path: Option<PathBuf>,
    pub error: Option<SandboxError>,
}

impl PathValidation {
    pub(super) fn from_result(result: Result<SandboxedPath, SandboxError>) -> Self {
        match result {
            Ok(path) => Self {
                is_valid: true,
                sanitized_path: Some(path.into_path_buf()),
                error: None,
            },
            Err(error) => Self {
                is_valid: false,
                sanitized_path: None,
                error: Some(error),
            },
        }
    }
}

/// What the resolved path will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PathKind {
    Argument,
    WorkingDir,
}
