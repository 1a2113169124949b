use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::SandboxError;
use super::pinned::PinnedPath;
use super::scopes;
use super::types::{PathKind, PathValidation, SandboxedPath};

/// The set of directories every path argument and working directory must stay in.
///
/// Roots are canonical and fixed at construction; clones share them.
#[derive(Debug, Clone)]
pub struct Sandbox {
    roots: Arc<[PathBuf]>,
}

impl Sandbox {
    /// Create a sandbox from one or more root directories.
    ///
    /// Every root must exist and be a directory; `/` is refused even when it is
    /// reached through a symlink or `..`.
    pub fn new(roots: Vec<PathBuf>) -> Result<Self, SandboxError> {
        let canonical = scopes::canonicalize_roots(roots)?;
        tracing::debug!(roots = ?canonical, "sandbox initialized");
        Ok(Self {
            roots: canonical.into(),
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Root that relative candidates are resolved against.
    pub fn primary_root(&self) -> &Path {
        // canonicalize_roots never returns an empty list
        &self.roots[0]
    }

    /// True when an already-resolved path equals or descends from a root.
    pub fn contains(&self, resolved: &Path) -> bool {
        self.roots.iter().any(|root| resolved.starts_with(root))
    }

    /// Validate a path argument.
    pub fn validate_path(&self, candidate: &str) -> PathValidation {
        PathValidation::from_result(self.resolve(candidate))
    }

    /// Validate a working directory. An existing target must be a directory.
    pub fn validate_working_dir(&self, candidate: &str) -> PathValidation {
        PathValidation::from_result(self.resolve_working_dir(candidate))
    }

    /// Resolve a path argument to its sandboxed form.
    pub fn resolve(&self, candidate: &str) -> Result<SandboxedPath, SandboxError> {
        self.resolve_as(candidate, PathKind::Argument)
    }

    /// Resolve a working directory to its sandboxed form.
    pub fn resolve_working_dir(&self, candidate: &str) -> Result<SandboxedPath, SandboxError> {
        self.resolve_as(candidate, PathKind::WorkingDir)
    }

    /// Resolve `candidate` and open a handle to it, so a later [`PinnedPath::verify`]
    /// can detect the path being swapped for something else.
    pub fn pin(&self, candidate: &str) -> Result<PinnedPath, SandboxError> {
        let resolved = self.resolve(candidate)?;
        PinnedPath::open(resolved)
    }

    fn resolve_as(&self, candidate: &str, kind: PathKind) -> Result<SandboxedPath, SandboxError> {
        let result = self.resolve_inner(candidate, kind);
        if let Err(e) = &result {
            tracing::debug!(?kind, "path rejected: {e}");
        }
        result
    }

    fn resolve_inner(&self, candidate: &str, kind: PathKind) -> Result<SandboxedPath, SandboxError> {
        if candidate.is_empty() {
            return Err(SandboxError::EmptyPath);
        }
        if candidate.contains('\0') {
            return Err(SandboxError::NullByte);
        }

        let expanded = scopes::expand_home(Path::new(candidate))?;
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.primary_root().join(expanded)
        };
        let normalized = scopes::normalize_path_lexically(&absolute);

        let (resolved, exists) = resolve_existing_prefix(&normalized)?;

        if !self.contains(&resolved) {
            return Err(SandboxError::OutsideSandbox {
                path: resolved,
                roots: self.roots.to_vec(),
            });
        }
        if kind == PathKind::WorkingDir && exists && !resolved.is_dir() {
            return Err(SandboxError::NotADirectory { path: resolved });
        }
        if resolved.to_str().is_none() {
            return Err(SandboxError::NotUtf8);
        }

        Ok(SandboxedPath::new(resolved))
    }
}

/// Canonicalize `path`, or failing that its deepest existing ancestor with the
/// missing suffix re-appended. Returns the result and whether `path` itself exists.
///
/// A component that exists but cannot be canonicalized (a dangling symlink, an
/// unreadable directory) is an error: appending it unresolved could hide a link
/// that points out of the sandbox.
fn resolve_existing_prefix(path: &Path) -> Result<(PathBuf, bool), SandboxError> {
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    let mut current = path;

    loop {
        match std::fs::canonicalize(current) {
            Ok(canonical) => {
                let exists = missing.is_empty();
                let resolved = missing
                    .iter()
                    .rev()
                    .fold(canonical, |acc, name| acc.join(name));
                return Ok((resolved, exists));
            }
            Err(e) => {
                if std::fs::symlink_metadata(current).is_ok() {
                    return Err(SandboxError::Unresolvable {
                        path: current.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                match (current.parent(), current.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name);
                        current = parent;
                    }
                    _ => {
                        return Err(SandboxError::Unresolvable {
                            path: path.to_path_buf(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}
