//! Server configuration from CLI flags and environment.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Sprout assessment backend.
#[derive(Debug, Parser)]
#[command(name = "sprout-server", about = "Child developmental assessment backend")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "SPROUT_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// SQLite database file
    #[arg(long, env = "SPROUT_DB", default_value = "sprout.db")]
    pub database: PathBuf,

    /// Connection pool size
    #[arg(long, env = "SPROUT_POOL_SIZE", default_value = "8")]
    pub pool_size: u32,

    /// Catalog seed file (JSON array of entries), applied at startup
    #[arg(long, env = "SPROUT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Secret for signing access tokens
    #[arg(long, env = "SPROUT_JWT_SECRET")]
    pub jwt_secret: String,

    /// Secret for signing refresh tokens
    #[arg(long, env = "SPROUT_JWT_REFRESH_SECRET")]
    pub jwt_refresh_secret: String,
}
