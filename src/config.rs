//! Runtime configuration from command-line flags and environment variables.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "reviewer-service",
    about = "Assigns and rebalances pull request reviewers inside teams",
    version
)]
pub struct Config {
    /// Address to bind the HTTP listener to
    #[arg(long, default_value = "0.0.0.0", env = "BIND_ADDRESS")]
    pub bind: IpAddr,

    /// HTTP port
    #[arg(short, long, default_value_t = 8080, env = "PORT")]
    pub port: u16,

    /// SQLite database file
    #[arg(long, default_value = "reviewer-service.db", env = "DATABASE_PATH")]
    pub database: PathBuf,

    /// Log level filter when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = crate::db::pool::DEFAULT_MAX_CONNECTIONS, env = "DB_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Time allowed for in-flight requests to finish on shutdown
    #[arg(long, default_value_t = 10, env = "SHUTDOWN_TIMEOUT_SECS")]
    pub shutdown_timeout_secs: u64,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
