use crate::infra::test_runner::TestRunnerSettings;
use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_REPO_ROOT: &str = "demos/sample_repo";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";

const ENV_CONFIG: &str = "REPO_PILOT_CONFIG";
const ENV_REPO_ROOT: &str = "REPO_PILOT_REPO_ROOT";
const ENV_PATCH_DIR: &str = "REPO_PILOT_PATCH_DIR";
const ENV_LOG_FILE: &str = "REPO_PILOT_LOG_FILE";

/// Command-line flags for `repo-pilot serve`.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Repository the tools are sandboxed to
    #[arg(long)]
    pub repo_root: Option<PathBuf>,

    /// Directory patch files are written to (default: OS temp dir)
    #[arg(long)]
    pub patch_dir: Option<PathBuf>,

    /// Parent directory for per-run test copies (default: OS temp dir)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Test command, split on whitespace (default: "pytest -q")
    #[arg(long)]
    pub test_command: Option<String>,

    /// Write logs here instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// TCP address to listen on
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Serve a single session over stdin/stdout instead of TCP
    #[arg(long)]
    pub stdio: bool,
}

/// Optional `repo-pilot.toml` contents. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub repo_root: Option<PathBuf>,
    pub patch_dir: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub test_command: Option<Vec<String>>,
    pub log_file: Option<PathBuf>,
    pub listen: Option<SocketAddr>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse config {}", path.display()))
    }
}

/// Resolved Tool Host configuration. Precedence: flags > env > file > defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub repo_root: PathBuf,
    pub patch_dir: PathBuf,
    pub runner: TestRunnerSettings,
    pub log_file: Option<PathBuf>,
    pub listen: SocketAddr,
}

impl ServerConfig {
    pub fn resolve(args: &ServeArgs) -> Result<Self> {
        Self::resolve_with_env(args, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env<F>(args: &ServeArgs, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = args
            .config
            .clone()
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from));
        let file = match config_path {
            Some(path) => ConfigFile::load(&path)?,
            None => ConfigFile::default(),
        };

        let env_path = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let repo_root = args
            .repo_root
            .clone()
            .or_else(|| env_path(ENV_REPO_ROOT))
            .or(file.repo_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO_ROOT));

        let patch_dir = args
            .patch_dir
            .clone()
            .or_else(|| env_path(ENV_PATCH_DIR))
            .or(file.patch_dir)
            .unwrap_or_else(std::env::temp_dir);

        let log_file = args
            .log_file
            .clone()
            .or_else(|| env_path(ENV_LOG_FILE))
            .or(file.log_file);

        let mut runner = TestRunnerSettings::default();
        if let Some(command) = args
            .test_command
            .as_deref()
            .map(|c| c.split_whitespace().map(String::from).collect::<Vec<_>>())
            .or(file.test_command)
        {
            runner.command = command;
        }
        runner.scratch_dir = args.scratch_dir.clone().or(file.scratch_dir);

        let listen = match args.listen.or(file.listen) {
            Some(addr) => addr,
            None => DEFAULT_LISTEN_ADDR
                .parse()
                .context("parse default listen address")?,
        };

        Ok(Self {
            repo_root,
            patch_dir,
            runner,
            log_file,
            listen,
        })
    }
}
