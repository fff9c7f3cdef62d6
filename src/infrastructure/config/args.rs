use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "huddle",
    version,
    about = "Real-time channel messaging from the terminal",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Message store base URL.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Push server WebSocket URL.
    #[arg(long, value_name = "URL")]
    pub push_url: Option<String>,

    /// Bearer token for the message store.
    #[arg(long, env = "HUDDLE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Id of the local user.
    #[arg(long, env = "HUDDLE_USER_ID")]
    pub user_id: Option<String>,

    /// Display name of the local user.
    #[arg(long)]
    pub user_name: Option<String>,

    /// Community to open.
    #[arg(long)]
    pub community: Option<String>,

    /// Channel to open.
    #[arg(long)]
    pub channel: Option<String>,

    /// Seconds between polls.
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Use the in-process store instead of a server.
    #[arg(long)]
    pub loopback: bool,
}
