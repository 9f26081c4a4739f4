//! Repository root boundary.
//!
//! Every path argument is resolved against the root and must stay inside it.
//! The check is lexical first so an escaping path is refused before the
//! filesystem is touched; existing targets are then canonicalized and checked
//! again so a symlink cannot lead outside.

use crate::domain::{ToolError, ToolResult};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRoot {
    root: PathBuf,
}

impl RepoRoot {
    /// Canonicalizes `path`; fails if it does not exist or is not a directory.
    pub fn open(path: impl AsRef<Path>) -> ToolResult<Self> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .map_err(|e| ToolError::io(path, e))?;
        if !root.is_dir() {
            return Err(ToolError::InvalidArgument(format!(
                "repository root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve `requested` against the root, refusing anything outside it.
    pub fn resolve(&self, requested: &str) -> ToolResult<PathBuf> {
        let out_of_bounds = || ToolError::OutOfBoundsPath {
            requested: requested.to_string(),
        };

        let lexical = normalize_lexically(&self.root.join(requested)).ok_or_else(out_of_bounds)?;
        if !self.contains(&lexical) {
            return Err(out_of_bounds());
        }

        // Missing targets stay lexical; the caller decides whether that is an error.
        match lexical.canonicalize() {
            Ok(canonical) if self.contains(&canonical) => Ok(canonical),
            Ok(_) => Err(out_of_bounds()),
            Err(_) => Ok(lexical),
        }
    }

    /// Path of `absolute` relative to the root, as a display string.
    pub fn relative(&self, absolute: &Path) -> Option<String> {
        absolute
            .strip_prefix(&self.root)
            .ok()
            .map(|rel| rel.to_string_lossy().into_owned())
    }

    fn contains(&self, path: &Path) -> bool {
        path == self.root || path.starts_with(&self.root)
    }
}

/// Fold `.` and `..` without consulting the filesystem.
/// Returns `None` when `..` would climb above the filesystem root.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}
