//! MCP server exposing the repository tools.
//!
//! Four tools are registered: `list_files`, `read_file`, `run_tests` and
//! `create_patch`. Messages are line-delimited JSON-RPC, served either over
//! stdio (one session, the server is a child process) or over TCP (one server
//! instance per accepted connection).

mod config;
mod tool;
mod transport;

pub use config::{ConfigFile, DEFAULT_LISTEN_ADDR, DEFAULT_REPO_ROOT, ServeArgs, ServerConfig};
pub use transport::LineDelimitedTransport;

use crate::infra::sandbox::RepoRoot;
use crate::infra::tools::RepoTools;
use anyhow::{Context, Result, anyhow};
use pmcp::{Server, ServerCapabilities};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

pub const SERVER_NAME: &str = "repo-pilot";

/// Bind the configured repository root and build the tool set.
pub fn tools_from_config(config: &ServerConfig) -> Result<Arc<RepoTools>> {
    let root = RepoRoot::open(&config.repo_root)
        .with_context(|| format!("open repository root {}", config.repo_root.display()))?;
    Ok(Arc::new(RepoTools::new(
        root,
        config.patch_dir.clone(),
        config.runner.clone(),
    )))
}

pub fn build_server(tools: Arc<RepoTools>) -> pmcp::Result<Server> {
    Server::builder()
        .name(SERVER_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .capabilities(ServerCapabilities::tools_only())
        .tool("list_files", tool::create_list_files_tool(tools.clone()))
        .tool("read_file", tool::create_read_file_tool(tools.clone()))
        .tool("run_tests", tool::create_run_tests_tool(tools.clone()))
        .tool("create_patch", tool::create_create_patch_tool(tools))
        .build()
}

/// Run `server` on one connection until the peer hangs up.
///
/// `Server::run` keeps its main loop alive after the transport closes, so the
/// session is bounded by the transport's close signal instead.
pub async fn serve_connection<R, W>(
    server: Server,
    transport: LineDelimitedTransport<R, W>,
) -> pmcp::Result<()>
where
    R: AsyncRead + Unpin + Send + Debug + 'static,
    W: AsyncWrite + Unpin + Send + Debug + 'static,
{
    let closed = transport.closed();
    tokio::select! {
        result = server.run(transport) => result,
        () = closed.cancelled() => Ok(()),
    }
}

/// Serve one session over stdin/stdout. Returns when the client disconnects.
pub async fn serve_stdio(tools: Arc<RepoTools>) -> pmcp::Result<()> {
    log::info!("repository root: {}", tools.root().display());
    let server = build_server(tools)?;
    log::info!("running MCP server on stdio (line-delimited)");
    serve_connection(server, LineDelimitedTransport::stdio()).await
}

/// Accept connections forever, one server instance per connection.
pub async fn serve_tcp(tools: Arc<RepoTools>, listener: TcpListener) -> Result<()> {
    log::info!("repository root: {}", tools.root().display());
    if let Ok(addr) = listener.local_addr() {
        log::info!("running MCP server on tcp://{addr}");
    }

    loop {
        let (stream, peer) = listener.accept().await.context("accept connection")?;
        log::info!("client connected: {peer}");

        let server =
            build_server(tools.clone()).map_err(|e| anyhow!("build MCP server: {e}"))?;
        tokio::spawn(async move {
            match serve_connection(server, LineDelimitedTransport::tcp(stream)).await {
                Ok(()) => log::info!("client disconnected: {peer}"),
                Err(err) => log::debug!("session with {peer} ended: {err}"),
            }
        });
    }
}
