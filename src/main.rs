use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use huddle::application::{DeliveryCoordinator, ReadStateTracker};
use huddle::domain::entities::{Channel, ChannelKind, Message, MessageAuthor, MessageId};
use huddle::domain::ports::{ChatDataPort, PushPort, ReadCachePort};
use huddle::infrastructure::{
    AppConfig, CliArgs, FileReadCache, HttpChatClient, InMemoryMessageStore, InMemoryPushHub,
    PushClient, StorageManager,
};
use huddle::presentation::ConsoleApp;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn read_cache(config: &AppConfig) -> Result<FileReadCache> {
    match &config.cache.read_markers_path {
        Some(path) => Ok(FileReadCache::new(path.clone())),
        None => FileReadCache::in_data_dir().wrap_err("No location for the read marker cache"),
    }
}

fn loopback_adapters(
    viewer: MessageAuthor,
    config: &AppConfig,
) -> (Arc<dyn ChatDataPort>, Arc<dyn PushPort>) {
    let hub = Arc::new(InMemoryPushHub::new());
    let store = InMemoryMessageStore::new(viewer, hub.clone());

    let channel = config.initial_channel();
    store.register_channel(Channel::new(
        channel.channel.clone(),
        channel.community.clone(),
        channel.channel.as_str(),
    ));
    store.register_channel(
        Channel::new("voice".into(), channel.community.clone(), "voice")
            .with_kind(ChannelKind::Voice)
            .with_position(1),
    );
    store.seed(
        &channel,
        Message::new(
            MessageId::new("welcome"),
            channel.channel.clone(),
            MessageAuthor::new("huddle", "huddle"),
            "Loopback mode: messages stay in this process. Type /help for commands.",
            Utc::now(),
        ),
    );

    let store: Arc<dyn ChatDataPort> = Arc::new(store);
    let push: Arc<dyn PushPort> = hub;
    (store, push)
}

fn remote_adapters(config: &AppConfig) -> Result<(Arc<dyn ChatDataPort>, Arc<dyn PushPort>)> {
    let store = HttpChatClient::new(config.server.api_base_url.clone(), config.token.clone())
        .wrap_err("Failed to create message store client")?;
    info!(api = %store.base_url(), push = %config.server.push_url, "Using remote message store");

    let store: Arc<dyn ChatDataPort> = Arc::new(store);
    let push: Arc<dyn PushPort> = Arc::new(PushClient::new(config.push_config()));
    Ok((store, push))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let config = load_config()?;
    init_logging(&config)?;

    info!(version = huddle::VERSION, "Starting {}", huddle::NAME);

    let viewer = config.viewer();
    let (store, push) = if config.loopback {
        loopback_adapters(viewer.clone(), &config)
    } else {
        if config.token.is_none() {
            warn!("No token configured, requests are sent unauthenticated");
        }
        remote_adapters(&config)?
    };

    let cache: Arc<dyn ReadCachePort> = Arc::new(read_cache(&config)?);
    let reads = Arc::new(ReadStateTracker::new(viewer.id.clone(), store.clone(), cache));
    reads.hydrate();

    let (coordinator, worker) =
        DeliveryCoordinator::spawn(store, push, reads, config.delivery_config());
    coordinator.select_channel(config.initial_channel())?;

    let console = ConsoleApp::new(coordinator.clone(), tokio::io::stdout());
    let result = console.run(tokio::io::stdin()).await;

    coordinator.shutdown();
    if let Err(e) = worker.await {
        warn!(error = %e, "Delivery worker ended abnormally");
    }

    info!("Exiting");
    result.wrap_err("Console failed")
}
