use serde::{Deserialize, Serialize};

/// Outcome of one `run_tests` invocation.
///
/// Serialized untagged so the wire shape is either
/// `{success, rc, stdout, stderr, elapsed}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestRunResult {
    Completed(CompletedRun),
    Failed(FailedRun),
}

/// The runner exited on its own within the time bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub success: bool,
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock seconds.
    pub elapsed: f64,
}

/// The run timed out or could not be set up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRun {
    pub success: bool,
    pub error: String,
}

pub const TIMEOUT_ERROR: &str = "timeout";

impl TestRunResult {
    pub fn completed(rc: i32, stdout: String, stderr: String, elapsed: f64) -> Self {
        TestRunResult::Completed(CompletedRun {
            success: rc == 0,
            rc,
            stdout,
            stderr,
            elapsed,
        })
    }

    pub fn failed(error: impl Into<String>) -> Self {
        TestRunResult::Failed(FailedRun {
            success: false,
            error: error.into(),
        })
    }

    pub fn timeout() -> Self {
        Self::failed(TIMEOUT_ERROR)
    }

    pub fn success(&self) -> bool {
        match self {
            TestRunResult::Completed(run) => run.success,
            TestRunResult::Failed(_) => false,
        }
    }

    pub fn rc(&self) -> Option<i32> {
        match self {
            TestRunResult::Completed(run) => Some(run.rc),
            TestRunResult::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TestRunResult::Completed(_) => None,
            TestRunResult::Failed(run) => Some(&run.error),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.error() == Some(TIMEOUT_ERROR)
    }
}
