//! Handle pinning for validated paths.
//!
//! Validation resolves a path once; the tool that later receives it resolves it
//! again. Between the two, a component could be swapped for a symlink that
//! leads out of the sandbox. A [`PinnedPath`] keeps a handle opened at
//! validation time so the caller can confirm, right before use, that the path
//! still resolves inside the sandbox to the very same file.

use std::fs::File;

use super::core::Sandbox;
use super::error::SandboxError;
use super::types::SandboxedPath;

/// A validated path together with a handle opened when it was validated.
#[derive(Debug)]
pub struct PinnedPath {
    path: SandboxedPath,
    handle: File,
}

impl PinnedPath {
    pub(super) fn open(path: SandboxedPath) -> Result<Self, SandboxError> {
        let handle = File::open(path.as_path()).map_err(|source| SandboxError::Io {
            path: path.as_path().to_path_buf(),
            source,
        })?;
        Ok(Self { path, handle })
    }

    pub fn path(&self) -> &SandboxedPath {
        &self.path
    }

    pub fn handle(&self) -> &File {
        &self.handle
    }

    /// Re-resolve the path and confirm it is still inside `sandbox` and still
    /// names the file that was opened at validation time.
    pub fn verify(&self, sandbox: &Sandbox) -> Result<(), SandboxError> {
        let changed = || SandboxError::PathChanged {
            path: self.path.as_path().to_path_buf(),
        };

        let current = sandbox.resolve(&self.path.to_arg())?;
        if current != self.path {
            return Err(changed());
        }

        let now = std::fs::metadata(current.as_path()).map_err(|_| changed())?;
        let then = self.handle.metadata().map_err(|source| SandboxError::Io {
            path: self.path.as_path().to_path_buf(),
            source,
        })?;
        if !same_file(&then, &now) {
            tracing::warn!(path = %self.path, "pinned path now names a different file");
            return Err(changed());
        }
        Ok(())
    }
}

#[cfg(unix)]
fn same_file(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    a.file_type() == b.file_type() && a.len() == b.len() && a.modified().ok() == b.modified().ok()
}
