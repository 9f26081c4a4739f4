//! repo-pilot CLI entry point.
//!
//! `serve` runs the Tool Host; `agent` runs the scripted driver against one.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::TcpListener;

use repo_pilot::application::agent::{AgentOptions, ChildSession, TcpSession, run_agent};
use repo_pilot::domain::{DEFAULT_PATCH_NAME, DEFAULT_TEST_TIMEOUT_SECS};
use repo_pilot::infra::logging::init_logging;
use repo_pilot::infra::mcp::{self, DEFAULT_LISTEN_ADDR, ServeArgs, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "repo-pilot")]
#[command(version)]
#[command(about = "Repository tools over MCP, and a scripted agent that drives them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tool host
    Serve(ServeArgs),

    /// Run the scripted agent pass against a tool host
    Agent(AgentArgs),
}

#[derive(Args, Debug)]
struct AgentArgs {
    /// Tool host address
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    server_addr: String,

    /// Launch a private tool host over stdio instead of connecting
    #[arg(long)]
    spawn_server: bool,

    /// Repository root for the spawned tool host
    #[arg(long, requires = "spawn_server")]
    repo_root: Option<PathBuf>,

    /// Wall-clock limit for the test run
    #[arg(long, default_value_t = DEFAULT_TEST_TIMEOUT_SECS)]
    timeout_seconds: u64,

    /// Name of the patch file to write
    #[arg(long, default_value = DEFAULT_PATCH_NAME)]
    patch_name: String,

    /// Write logs here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Agent(args) => agent(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig::resolve(&args)?;
    init_logging(config.log_file.as_deref())?;
    log::info!("starting repo-pilot tool host");

    let tools = mcp::tools_from_config(&config)?;
    if args.stdio {
        return mcp::serve_stdio(tools)
            .await
            .map_err(|e| anyhow!("stdio server error: {e}"));
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    mcp::serve_tcp(tools, listener).await
}

async fn agent(args: AgentArgs) -> Result<()> {
    init_logging(args.log_file.as_deref())?;

    let options = AgentOptions {
        timeout_secs: args.timeout_seconds,
        patch_name: args.patch_name.clone(),
        ..Default::default()
    };

    let report = if args.spawn_server {
        let exe = std::env::current_exe().context("locate repo-pilot binary")?;
        let mut server_args = vec!["serve".to_string(), "--stdio".to_string()];
        if let Some(root) = &args.repo_root {
            server_args.push("--repo-root".to_string());
            server_args.push(root.display().to_string());
        }
        let mut session = ChildSession::spawn(&exe, &server_args).await?;
        run_agent(&mut session, &options).await?
    } else {
        let mut session = TcpSession::connect(args.server_addr.as_str()).await?;
        run_agent(&mut session, &options).await?
    };

    println!("{report}");
    Ok(())
}
