//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::DeliveryConfig;
use crate::domain::entities::{AuthToken, ChannelKey, MessageAuthor};
use crate::infrastructure::push::{
    DEFAULT_PUSH_URL, DEFAULT_TOPIC_PREFIX, MAX_RECONNECT_ATTEMPTS, PushClientConfig,
};

pub const APP_NAME: &str = "huddle";
pub const APP_QUALIFIER: &str = "dev";
pub const APP_ORGANIZATION: &str = "huddle";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from `config.toml` merged with CLI arguments.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Bearer token for the message store and push server.
    #[serde(skip)]
    pub token: Option<AuthToken>,

    /// Run against the in-process store instead of a server.
    #[serde(skip)]
    pub loopback: bool,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub delivery: DeliverySettings,

    #[serde(default)]
    pub push: PushSettings,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Message store and push endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_push_url")]
    pub push_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            push_url: default_push_url(),
        }
    }
}

/// Who the client acts as and which channel it opens first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default = "default_community")]
    pub community: String,

    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            user_name: default_user_name(),
            community: default_community(),
            channel: default_channel(),
        }
    }
}

/// Channel view timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    /// Seconds between polls of the open channel.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Keystroke silence before a typing stop is sent.
    #[serde(default = "default_typing_ms")]
    pub typing_idle_ms: u64,

    /// How long a remote typing indicator lives without a refresh.
    #[serde(default = "default_typing_ms")]
    pub remote_typing_ttl_ms: u64,

    /// Quiet time on a settled timeline before it is marked read.
    #[serde(default = "default_read_dwell_ms")]
    pub read_dwell_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            typing_idle_ms: default_typing_ms(),
            remote_typing_ttl_ms: default_typing_ms(),
            read_dwell_ms: default_read_dwell_ms(),
        }
    }
}

/// Push transport options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            topic_prefix: default_topic_prefix(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Local read-marker cache location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub read_markers_path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_push_url() -> String {
    DEFAULT_PUSH_URL.to_string()
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_user_name() -> String {
    "me".to_string()
}

fn default_community() -> String {
    "home".to_string()
}

fn default_channel() -> String {
    "general".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    15
}

const fn default_typing_ms() -> u64 {
    2000
}

const fn default_read_dwell_ms() -> u64 {
    1000
}

fn default_topic_prefix() -> String {
    DEFAULT_TOPIC_PREFIX.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_reconnect_attempts() -> u32 {
    MAX_RECONNECT_ATTEMPTS
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(api_url) = args.api_url {
            self.server.api_base_url = api_url;
        }
        if let Some(push_url) = args.push_url {
            self.server.push_url = push_url;
        }
        if let Some(token) = args.token.and_then(AuthToken::new) {
            self.token = Some(token);
        }
        if let Some(user_id) = args.user_id {
            self.session.user_id = user_id;
        }
        if let Some(user_name) = args.user_name {
            self.session.user_name = user_name;
        }
        if let Some(community) = args.community {
            self.session.community = community;
        }
        if let Some(channel) = args.channel {
            self.session.channel = channel;
        }
        if let Some(poll_interval) = args.poll_interval {
            self.delivery.poll_interval_secs = poll_interval;
        }
        if args.loopback {
            self.loopback = true;
        }
    }

    #[must_use]
    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig::new()
            .with_poll_interval(Duration::from_secs(self.delivery.poll_interval_secs.max(1)))
            .with_typing_idle(Duration::from_millis(self.delivery.typing_idle_ms))
            .with_remote_typing_ttl(Duration::from_millis(self.delivery.remote_typing_ttl_ms))
            .with_read_dwell(Duration::from_millis(self.delivery.read_dwell_ms))
    }

    #[must_use]
    pub fn push_config(&self) -> PushClientConfig {
        PushClientConfig::new(self.server.push_url.clone())
            .with_topic_prefix(self.push.topic_prefix.clone())
            .with_auto_reconnect(self.push.auto_reconnect)
            .with_max_reconnect_attempts(self.push.max_reconnect_attempts)
    }

    #[must_use]
    pub fn viewer(&self) -> MessageAuthor {
        MessageAuthor::new(self.session.user_id.as_str(), self.session.user_name.clone())
    }

    #[must_use]
    pub fn initial_channel(&self) -> ChannelKey {
        ChannelKey::new(self.session.community.as_str(), self.session.channel.as_str())
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("huddle.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}
