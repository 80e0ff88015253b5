//! Command-line and environment configuration for the server binary.

use bookshelf_core::default_log_level;
use clap::Parser;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_FILE: &str = "bookshelf.db";
pub const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_LOG_DIR: &str = "logs";

/// Runtime settings. Every flag can also be set through its env var.
#[derive(Debug, Clone, Parser)]
#[command(name = "bookshelf", version, about = "Local web catalogue for your books")]
pub struct ServerConfig {
    /// Address to bind. Keep the loopback default unless you know why.
    #[arg(long, env = "BOOKSHELF_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, env = "BOOKSHELF_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// SQLite file holding the catalogue. Created on first run.
    #[arg(long, env = "BOOKSHELF_DB", default_value = DEFAULT_DB_FILE)]
    pub db_path: PathBuf,

    /// Served under `/static`. Uploaded covers go to its `covers/` subdirectory.
    #[arg(long, env = "BOOKSHELF_STATIC_DIR", default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: PathBuf,

    /// Directory for rolling log files. Defaults to `./logs`.
    #[arg(long, env = "BOOKSHELF_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error. Defaults by build mode.
    #[arg(long, env = "BOOKSHELF_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Absolute log directory; relative paths resolve against the working directory.
    pub fn resolved_log_dir(&self) -> io::Result<PathBuf> {
        let dir = self
            .log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(std::env::current_dir()?.join(dir))
        }
    }
}
