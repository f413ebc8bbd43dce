use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "colab-hub")]
#[command(about = "Project collaboration backend: user file trees, invitations and notifications")]
pub struct Cli {
    /// Listen address
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Directory holding one JSON file tree per user
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// JSON array of user profiles seeding the directory
    #[arg(short, long)]
    pub users: Option<PathBuf>,

    /// File persisting invitations and notifications across restarts
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Keep file trees in memory only
    #[arg(long)]
    pub memory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub data_dir: PathBuf,
    pub users_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub in_memory: bool,
}

impl ServerConfig {
    /// Read `COLAB_HUB_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            addr: std::env::var("COLAB_HUB_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            data_dir: std::env::var("COLAB_HUB_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            users_file: std::env::var("COLAB_HUB_USERS").ok().map(PathBuf::from),
            state_file: std::env::var("COLAB_HUB_STATE").ok().map(PathBuf::from),
            in_memory: false,
        }
    }

    /// Command-line flags take precedence over the environment.
    pub fn merge_cli(mut self, cli: Cli) -> Self {
        if let Some(addr) = cli.addr {
            self.addr = addr;
        }
        if let Some(dir) = cli.data_dir {
            self.data_dir = dir;
        }
        if cli.users.is_some() {
            self.users_file = cli.users;
        }
        if cli.state.is_some() {
            self.state_file = cli.state;
        }
        self.in_memory |= cli.memory;
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.addr))
    }
}
