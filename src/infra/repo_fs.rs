//! Read-only repository inspection: `list_files` and `read_file`.

use super::sandbox::RepoRoot;
use crate::domain::{MAX_LISTED_FILES, MAX_READ_BYTES, ToolError, ToolResult, file_too_large_sentinel};
use ignore::WalkBuilder;
use std::fs::File;
use std::io::Read;

/// Recursively list regular files under `path`, relative to the repository root.
///
/// Order is whatever the filesystem enumerates. Collection stops silently at
/// [`MAX_LISTED_FILES`]. A path that is not a directory lists nothing.
pub fn list_files(root: &RepoRoot, path: &str) -> ToolResult<Vec<String>> {
    let dir = root.resolve(path)?;
    if !dir.is_dir() {
        log::debug!("list_files: {} is not a directory", dir.display());
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(&dir)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("list_files: skipping unreadable entry: {err}");
                continue;
            }
        };

        let is_file = entry.file_type().is_some_and(|ft| {
            ft.is_file() || (ft.is_symlink() && entry.path().is_file())
        });
        if !is_file {
            continue;
        }

        if let Some(rel) = root.relative(entry.path()) {
            files.push(rel);
            if files.len() >= MAX_LISTED_FILES {
                log::info!("list_files: capped at {MAX_LISTED_FILES} entries");
                break;
            }
        }
    }

    Ok(files)
}

/// Read a file as text, replacing invalid UTF-8.
///
/// Files above [`MAX_READ_BYTES`] are not read; a size sentinel is returned
/// instead.
pub fn read_file(root: &RepoRoot, path: &str) -> ToolResult<String> {
    let file_path = root.resolve(path)?;
    let meta = std::fs::metadata(&file_path).map_err(|e| ToolError::io(&file_path, e))?;
    if !meta.is_file() {
        return Err(ToolError::NotAFile(file_path));
    }
    if meta.len() > MAX_READ_BYTES {
        return Ok(file_too_large_sentinel(meta.len()));
    }

    let file = File::open(&file_path).map_err(|e| ToolError::io(&file_path, e))?;
    let mut bytes = Vec::with_capacity(meta.len() as usize);
    file.take(MAX_READ_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| ToolError::io(&file_path, e))?;

    // Grew between stat and read.
    if bytes.len() as u64 > MAX_READ_BYTES {
        let size = std::fs::metadata(&file_path)
            .map(|m| m.len())
            .unwrap_or(bytes.len() as u64);
        return Ok(file_too_large_sentinel(size));
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn repo() -> (tempfile::TempDir, RepoRoot) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = RepoRoot::open(dir.path()).expect("root");
        (dir, root)
    }

    #[test]
    fn test_list_files_empty_directory() {
        let (_dir, root) = repo();
        assert!(list_files(&root, ".").unwrap().is_empty());
    }

    #[test]
    fn test_list_files_recurses_and_is_root_relative() {
        let (dir, root) = repo();
        std::fs::create_dir_all(dir.path().join("tests/unit")).unwrap();
        std::fs::write(dir.path().join("calc.py"), "").unwrap();
        std::fs::write(dir.path().join("tests/unit/test_calc.py"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();

        let files: HashSet<String> = list_files(&root, ".").unwrap().into_iter().collect();
        let expected: HashSet<String> = ["calc.py", "tests/unit/test_calc.py", ".hidden"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(files, expected);

        let nested = list_files(&root, "tests").unwrap();
        assert_eq!(nested, vec!["tests/unit/test_calc.py".to_string()]);
    }

    #[test]
    fn test_list_files_caps_at_exactly_2000() {
        let (dir, root) = repo();
        for i in 0..2005 {
            std::fs::write(dir.path().join(format!("f{i}.txt")), "").unwrap();
        }
        let files = list_files(&root, ".").unwrap();
        assert_eq!(files.len(), 2000);
    }

    #[test]
    fn test_list_files_on_missing_or_file_path_is_empty() {
        let (dir, root) = repo();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        assert!(list_files(&root, "absent").unwrap().is_empty());
        assert!(list_files(&root, "a.txt").unwrap().is_empty());
    }

    #[test]
    fn test_list_files_refuses_escape() {
        let (_dir, root) = repo();
        let err = list_files(&root, "../../etc").unwrap_err();
        assert!(matches!(err, ToolError::OutOfBoundsPath { .. }));
    }

    #[test]
    fn test_read_file_at_cap_returns_contents() {
        let (dir, root) = repo();
        let body = "a".repeat(MAX_READ_BYTES as usize);
        std::fs::write(dir.path().join("exact.txt"), &body).unwrap();
        assert_eq!(read_file(&root, "exact.txt").unwrap(), body);
    }

    #[test]
    fn test_read_file_over_cap_returns_sentinel() {
        let (dir, root) = repo();
        let body = "a".repeat(MAX_READ_BYTES as usize + 1);
        std::fs::write(dir.path().join("big.txt"), &body).unwrap();
        assert_eq!(
            read_file(&root, "big.txt").unwrap(),
            "[file too large: 204801 bytes]"
        );
    }

    #[test]
    fn test_read_file_replaces_invalid_utf8() {
        let (dir, root) = repo();
        std::fs::write(dir.path().join("bin.dat"), [b'o', b'k', 0xff, b'!']).unwrap();
        assert_eq!(read_file(&root, "bin.dat").unwrap(), "ok\u{FFFD}!");
    }

    #[test]
    fn test_read_file_missing_is_not_found() {
        let (_dir, root) = repo();
        let err = read_file(&root, "nope.py").unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn test_read_file_directory_is_rejected() {
        let (dir, root) = repo();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        let err = read_file(&root, "pkg").unwrap_err();
        assert!(matches!(err, ToolError::NotAFile(_)));
    }

    #[test]
    fn test_read_file_refuses_escape() {
        let (_dir, root) = repo();
        let err = read_file(&root, "../../etc/passwd").unwrap_err();
        assert!(matches!(err, ToolError::OutOfBoundsPath { .. }));
    }
}
