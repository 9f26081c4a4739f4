//! Sandboxed test runs.
//!
//! Each run deep-copies the repository into a fresh scratch directory, runs
//! the configured test command there under a wall-clock bound, and removes the
//! scratch directory on every exit path. Failures never propagate: they come
//! back as a [`TestRunResult`] the caller can branch on.

use super::sandbox::RepoRoot;
use crate::domain::TestRunResult;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

const SCRATCH_PREFIX: &str = "repo-pilot-run-";

/// How tests are run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunnerSettings {
    /// Program and arguments, executed with the working copy as cwd.
    pub command: Vec<String>,
    /// Parent for per-run scratch directories; the OS temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for TestRunnerSettings {
    fn default() -> Self {
        Self {
            command: vec!["pytest".to_string(), "-q".to_string()],
            scratch_dir: None,
        }
    }
}

pub async fn run_tests(
    root: &RepoRoot,
    settings: &TestRunnerSettings,
    timeout: Duration,
) -> TestRunResult {
    match run_tests_in_scratch(root, settings, timeout).await {
        Ok(result) => result,
        Err(err) => {
            log::warn!("run_tests failed: {err:#}");
            TestRunResult::failed(format!("{err:#}"))
        }
    }
}

async fn run_tests_in_scratch(
    root: &RepoRoot,
    settings: &TestRunnerSettings,
    timeout: Duration,
) -> Result<TestRunResult> {
    let (program, args) = settings
        .command
        .split_first()
        .context("test command is empty")?;
    let program_path =
        which::which(program).with_context(|| format!("test runner not found: {program}"))?;

    // Dropped (and removed) on every return below.
    let scratch = scratch_dir(settings.scratch_dir.as_deref())?;
    let work_dir = scratch.path().join("repo");

    let source = root.path().to_path_buf();
    let dest = work_dir.clone();
    tokio::task::spawn_blocking(move || copy_tree(&source, &dest))
        .await
        .context("repository copy task join error")??;

    log::debug!(
        "running {} in {}",
        settings.command.join(" "),
        work_dir.display()
    );

    let start = Instant::now();
    let child = Command::new(&program_path)
        .args(args)
        .current_dir(&work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {}", program_path.display()))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.context("failed to collect test runner output")?,
        Err(_) => {
            log::info!("tests timed out after {}s", timeout.as_secs_f64());
            return Ok(TestRunResult::timeout());
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    let result = TestRunResult::completed(
        exit_code(output.status),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed,
    );
    log::info!("tests finished: success={}", result.success());
    Ok(result)
}

fn scratch_dir(parent: Option<&Path>) -> Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    match parent {
        Some(parent) => builder
            .tempdir_in(parent)
            .with_context(|| format!("create scratch dir in {}", parent.display())),
        None => builder.tempdir().context("create scratch dir"),
    }
}

/// Deep copy `source` into `dest`, following symlinks.
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;

    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(true)
        .build();

    for entry in walker {
        let entry = entry.context("walk repository")?;
        let rel = entry.path().strip_prefix(source)?;
        let target = dest.join(rel);
        match entry.file_type() {
            Some(ft) if ft.is_dir() => {
                std::fs::create_dir_all(&target)
                    .with_context(|| format!("create {}", target.display()))?;
            }
            Some(ft) if ft.is_file() => {
                std::fs::copy(entry.path(), &target)
                    .with_context(|| format!("copy {}", entry.path().display()))?;
            }
            // FIFOs, sockets and devices would block or fail the copy.
            _ => log::debug!("skipping special file {}", entry.path().display()),
        }
    }
    Ok(())
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
