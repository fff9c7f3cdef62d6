use tokio::sync::mpsc;

use crate::application::services::{LocalTyping, MessageTimeline, RemoteTypingSet};
use crate::domain::TransportStatus;
use crate::domain::entities::{ChannelKey, UserId};
use crate::domain::ports::PushEvent;

use super::config::DeliveryConfig;

/// State of the one open channel view.
pub(crate) struct ChannelSession {
    pub generation: u64,
    pub key: ChannelKey,
    pub timeline: MessageTimeline,
    pub local_typing: LocalTyping,
    pub remote_typing: RemoteTypingSet,
    pub push: Option<mpsc::UnboundedReceiver<PushEvent>>,
    pub transport: TransportStatus,
    pub poll_in_flight: bool,
    pub loaded: bool,
}

impl ChannelSession {
    pub fn new(generation: u64, key: ChannelKey, viewer: UserId, config: &DeliveryConfig) -> Self {
        Self {
            generation,
            key,
            timeline: MessageTimeline::new(),
            local_typing: LocalTyping::new(config.typing_idle),
            remote_typing: RemoteTypingSet::new(viewer, config.remote_typing_ttl),
            push: None,
            transport: TransportStatus::Connecting,
            poll_in_flight: false,
            loaded: false,
        }
    }

    pub const fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
