//! Contract limits shared by the Tool Host and the Agent Driver.
//!
//! These are part of the tool contract, not tuning knobs: callers rely on the
//! exact values (truncation at `MAX_LISTED_FILES`, sentinel above
//! `MAX_READ_BYTES`).

/// `list_files` stops collecting once this many paths have been gathered.
pub const MAX_LISTED_FILES: usize = 2000;

/// Files strictly larger than this are answered with a size sentinel.
pub const MAX_READ_BYTES: u64 = 200 * 1024;

pub const DEFAULT_LIST_PATH: &str = ".";
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_PATCH_NAME: &str = "fix.patch";

/// Characters of a test file shown by the driver.
pub const PREVIEW_CHARS: usize = 2000;

/// Paths shown in the driver's file sample.
pub const FILE_SAMPLE_LEN: usize = 30;

pub fn file_too_large_sentinel(size: u64) -> String {
    format!("[file too large: {size} bytes]")
}
