use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Hanzi learning server
#[derive(Debug, Parser)]
#[command(name = "hanzi", about = "Character lists, progress tracking, and cached pronunciation audio")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "hanzi.toml", env = "HANZI_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "HANZI_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter used when neither `RUST_LOG` nor the config sets one
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,
}
