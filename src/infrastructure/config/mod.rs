//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{
    APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig, CacheConfig, DeliverySettings, LogLevel,
    PushSettings, ServerConfig, SessionConfig,
};
pub use args::CliArgs;
pub use storage::{ConfigError, StorageManager};
