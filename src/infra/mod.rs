//! Infrastructure layer (adapters/implementations).
//!
//! Filesystem sandboxing, subprocess test runs, patch output, logging and the
//! MCP server binding.

pub mod logging;
pub mod mcp;
pub mod patch;
pub mod repo_fs;
pub mod sandbox;
pub mod test_runner;
pub mod tools;
