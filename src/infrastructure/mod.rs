//! Infrastructure layer with external service adapters.

/// HTTP message store client.
pub mod api;
/// Application configuration.
pub mod config;
/// Loopback store and push hub.
pub mod memory;
/// WebSocket push client.
pub mod push;
/// Local read-marker cache.
pub mod read_cache;

pub use api::HttpChatClient;
pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager};
pub use memory::{InMemoryMessageStore, InMemoryPushHub};
pub use push::{PushClient, PushClientConfig};
pub use read_cache::FileReadCache;
