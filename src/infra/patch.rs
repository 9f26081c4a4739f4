//! Write-only patch artifacts. Patches are never parsed for correctness,
//! never applied and never cleaned up.

use crate::domain::{ToolError, ToolResult};
use std::path::{Component, Path, PathBuf};
use unidiff::PatchSet;

/// Write `patch_text` verbatim to `<patch_dir>/<patch_name>`, replacing any
/// existing file. Returns the absolute path written.
pub fn create_patch(patch_dir: &Path, patch_text: &str, patch_name: &str) -> ToolResult<PathBuf> {
    validate_patch_name(patch_name)?;

    if !looks_like_unified_diff(patch_text) {
        log::warn!("patch {patch_name} does not parse as a unified diff; writing it anyway");
    }

    std::fs::create_dir_all(patch_dir).map_err(|e| ToolError::io(patch_dir, e))?;
    let dir = patch_dir
        .canonicalize()
        .map_err(|e| ToolError::io(patch_dir, e))?;
    let out = dir.join(patch_name);
    std::fs::write(&out, patch_text).map_err(|e| ToolError::io(&out, e))?;

    log::info!("wrote patch {}", out.display());
    Ok(out)
}

fn validate_patch_name(name: &str) -> ToolResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(ToolError::InvalidArgument(format!(
            "patch_name must be a plain file name, got {name:?}"
        ))),
    }
}

fn looks_like_unified_diff(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut patch_set = PatchSet::new();
    patch_set.parse(trimmed).is_ok() && !patch_set.files().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "--- a/calc.py\n+++ b/calc.py\n@@ -1,2 +1,2 @@\n def add(a, b):\n-    return a - b\n+    return a + b\n";

    #[test]
    fn test_second_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_patch(dir.path(), "x", "a.patch").unwrap();
        let second = create_patch(dir.path(), "y", "a.patch").unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "y");

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_returns_absolute_path_and_writes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let out = create_patch(dir.path(), DIFF, "fix.patch").unwrap();
        assert!(out.is_absolute());
        assert!(out.ends_with("fix.patch"));
        assert_eq!(std::fs::read_to_string(out).unwrap(), DIFF);
    }

    #[test]
    fn test_creates_missing_patch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("patches/out");
        let out = create_patch(&nested, DIFF, "fix.patch").unwrap();
        assert!(out.exists());
    }

    #[test]
    fn test_rejects_names_with_separators() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", ".", "..", "../evil.patch", "sub/fix.patch", "/tmp/abs.patch", "./fix.patch"] {
            let err = create_patch(dir.path(), "x", bad).unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidArgument(_)),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn test_diff_detection_is_advisory() {
        assert!(looks_like_unified_diff(DIFF));
        assert!(!looks_like_unified_diff("not a diff"));
        assert!(!looks_like_unified_diff("   "));
    }
}
