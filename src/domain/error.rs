//! Error taxonomy for Tool Host operations.
//!
//! Only conditions that indicate a usage error (or a genuinely broken
//! filesystem) are errors. Oversized files and failed or timed-out test runs
//! are ordinary results and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the repository tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("path outside allowed repo: {requested}")]
    OutOfBoundsPath { requested: String },

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return ToolError::NotFound(path);
        }
        ToolError::Io { path, source }
    }

    /// True for errors caused by the caller's arguments rather than the host.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ToolError::OutOfBoundsPath { .. }
                | ToolError::NotFound(_)
                | ToolError::NotAFile(_)
                | ToolError::InvalidArgument(_)
        )
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
