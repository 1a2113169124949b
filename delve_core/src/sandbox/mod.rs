//! # Path Sandbox
//!
//! Confines every filesystem path the agent supplies to a fixed set of root
//! directories. A candidate is expanded (`~`), made absolute against the primary
//! root, normalized, and resolved through symlinks: the path itself when it
//! exists, else its deepest existing ancestor with the missing suffix
//! re-appended. It is accepted only if the result equals or descends,
//! component-wise, from a root.
//!
//! The resolved path is what callers must use. [`SandboxedPath`] can only be
//! obtained from a [`Sandbox`], which is how the command builders enforce that
//! every path slot was validated.
//!
//! Working directories go through the same resolution, with one extra rule: an
//! existing target must be a directory.

pub(crate) mod core;
mod error;
mod pinned;
mod scopes;
mod types;

pub use core::Sandbox;
pub use error::SandboxError;
pub use pinned::PinnedPath;
pub use scopes::{expand_home, normalize_path_lexically};
pub use types::{PathValidation, SandboxedPath};
