use super::normalize::ToolResponse;
use crate::infra::mcp::LineDelimitedTransport;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use pmcp::shared::Transport;
use pmcp::types::{CallToolResult, Content};
use pmcp::{Client, ClientCapabilities};
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// A request/response channel to a Tool Host.
#[async_trait]
pub trait ToolSession: Send {
    /// Capability handshake. Returns a display name for the server.
    async fn initialize(&mut self) -> Result<String>;

    /// Names of the tools the server offers.
    async fn list_tools(&mut self) -> Result<Vec<String>>;

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResponse>;
}

/// [`ToolSession`] over an MCP client.
pub struct McpSession<T: Transport> {
    client: Client<T>,
    // Spawned server, killed when the session is dropped.
    _server: Option<Child>,
}

pub type TcpSession = McpSession<LineDelimitedTransport<OwnedReadHalf, OwnedWriteHalf>>;
pub type ChildSession = McpSession<LineDelimitedTransport<ChildStdout, ChildStdin>>;

impl TcpSession {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("connect to tool host")?;
        let peer = stream.peer_addr().ok();
        log::info!("connected to tool host at {peer:?}");
        Ok(Self {
            client: Client::new(LineDelimitedTransport::tcp(stream)),
            _server: None,
        })
    }
}

impl ChildSession {
    /// Launch a stdio Tool Host and talk to it over its pipes.
    pub async fn spawn(program: &Path, args: &[String]) -> Result<Self> {
        log::info!("spawn: {} {}", program.display(), args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn tool host {}", program.display()))?;

        let stdin = child.stdin.take().context("tool host stdin unavailable")?;
        let stdout = child.stdout.take().context("tool host stdout unavailable")?;

        Ok(Self {
            client: Client::new(LineDelimitedTransport::new(stdout, stdin)),
            _server: Some(child),
        })
    }
}

#[async_trait]
impl<T: Transport + 'static> ToolSession for McpSession<T> {
    async fn initialize(&mut self) -> Result<String> {
        let info = self
            .client
            .initialize(ClientCapabilities::default())
            .await
            .map_err(|e| anyhow!("initialize failed: {e}"))?;
        Ok(format!("{} {}", info.server_info.name, info.server_info.version))
    }

    async fn list_tools(&mut self) -> Result<Vec<String>> {
        let listed = self
            .client
            .list_tools(None)
            .await
            .map_err(|e| anyhow!("tools/list failed: {e}"))?;
        Ok(listed.tools.into_iter().map(|tool| tool.name).collect())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResponse> {
        let result = self
            .client
            .call_tool(name.to_string(), arguments)
            .await
            .map_err(|e| anyhow!("{name} failed: {e}"))?;
        into_response(name, result)
    }
}

fn into_response(name: &str, result: CallToolResult) -> Result<ToolResponse> {
    let text: String = result
        .content
        .iter()
        .filter_map(|content| match content {
            Content::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if result.is_error {
        bail!("{name} returned an error: {text}");
    }
    Ok(ToolResponse::new(text))
}
