use std::path::{Component, Path, PathBuf};

use super::error::SandboxError;

/// Canonicalize and validate a list of sandbox roots.
///
/// Rejects empty paths and the filesystem root, before and after resolution.
pub(super) fn canonicalize_roots(roots: Vec<PathBuf>) -> Result<Vec<PathBuf>, SandboxError> {
    if roots.is_empty() {
        return Err(SandboxError::NoRoots);
    }

    let mut canonicalized: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if root.as_os_str().is_empty() || root == Path::new("/") {
            return Err(SandboxError::InvalidRoot {
                root,
                reason: "'/' or an empty path cannot be a sandbox root".to_string(),
            });
        }

        let expanded = expand_home(&root)?;
        let canonical = std::fs::canonicalize(&expanded).map_err(|e| SandboxError::InvalidRoot {
            root: root.clone(),
            reason: e.to_string(),
        })?;

        if !canonical.is_dir() {
            return Err(SandboxError::InvalidRoot {
                root,
                reason: "not a directory".to_string(),
            });
        }
        if canonical.parent().is_none() {
            return Err(SandboxError::InvalidRoot {
                root,
                reason: format!("resolves to the filesystem root '{}'", canonical.display()),
            });
        }

        if !canonicalized.contains(&canonical) {
            canonicalized.push(canonical);
        }
    }
    Ok(canonicalized)
}

/// Expand a leading `~` or `~/` to the home directory. `~user` is left alone.
pub fn expand_home(path: &Path) -> Result<PathBuf, SandboxError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or(SandboxError::HomeUnavailable)?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Normalize a path lexically (without filesystem access).
pub fn normalize_path_lexically(path: &Path) -> PathBuf {
    let mut stack = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if stack
                    .last()
                    .is_some_and(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
                {
                    stack.pop();
                }
            }
            c => stack.push(c),
        }
    }

    stack.iter().collect()
}
