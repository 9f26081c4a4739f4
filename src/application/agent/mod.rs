//! Agent Driver: a fixed, single-pass tool-calling script against a Tool Host.
//!
//! The workflow only talks to a [`ToolSession`]; [`McpSession`] is the MCP
//! implementation, either connected over TCP or owning a spawned stdio server.

mod normalize;
mod session;
mod workflow;

pub use normalize::{
    ToolResponse, decode_text, find_test_file, normalize_file_list, preview, reported_success,
};
pub use session::{ChildSession, McpSession, TcpSession, ToolSession};
pub use workflow::{AgentOptions, AgentReport, DEMO_PATCH, InspectedFile, Preview, run_agent};
