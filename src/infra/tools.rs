//! The Tool Host's four operations bound to one immutable configuration.

use super::patch;
use super::repo_fs;
use super::sandbox::RepoRoot;
use super::test_runner::{self, TestRunnerSettings};
use crate::domain::{TestRunResult, ToolResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RepoTools {
    root: RepoRoot,
    patch_dir: PathBuf,
    runner: TestRunnerSettings,
}

impl RepoTools {
    pub fn new(root: RepoRoot, patch_dir: PathBuf, runner: TestRunnerSettings) -> Self {
        Self {
            root,
            patch_dir,
            runner,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn patch_dir(&self) -> &Path {
        &self.patch_dir
    }

    pub fn list_files(&self, path: &str) -> ToolResult<Vec<String>> {
        repo_fs::list_files(&self.root, path)
    }

    pub fn read_file(&self, path: &str) -> ToolResult<String> {
        repo_fs::read_file(&self.root, path)
    }

    pub async fn run_tests(&self, timeout: Duration) -> TestRunResult {
        test_runner::run_tests(&self.root, &self.runner, timeout).await
    }

    pub fn create_patch(&self, patch_text: &str, patch_name: &str) -> ToolResult<PathBuf> {
        patch::create_patch(&self.patch_dir, patch_text, patch_name)
    }
}
