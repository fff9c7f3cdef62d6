use tokio::sync::oneshot;

use crate::application::services::{ReactionRefresh, format_typing_indicator};
use crate::domain::TransportStatus;
use crate::domain::entities::{ChannelKey, Message, MessageId, ReactionSummary, ReadMarker};
use crate::domain::errors::{ApiError, DeliveryError};

pub type Responder<T> = oneshot::Sender<Result<T, DeliveryError>>;

/// Requests from the UI side.
#[derive(Debug)]
pub enum CoordinatorCommand {
    SelectChannel {
        channel: ChannelKey,
    },
    CloseChannel,
    SendMessage {
        content: String,
        reply_to: Option<MessageId>,
        respond: Responder<Message>,
    },
    ToggleReaction {
        message_id: MessageId,
        emoji: String,
        respond: Responder<ReactionSummary>,
    },
    Keystroke,
    Shutdown,
}

/// Completions of work the worker spawned, tagged with the session generation.
#[derive(Debug)]
pub(crate) enum Ingress {
    Polled {
        generation: u64,
        initial: bool,
        result: Result<Vec<Message>, ApiError>,
    },
    Sent {
        generation: u64,
        result: Result<Message, DeliveryError>,
        respond: Responder<Message>,
    },
    ReactionsRefreshed {
        generation: u64,
        result: Result<ReactionRefresh, DeliveryError>,
        respond: Responder<ReactionSummary>,
    },
    ReadPersisted {
        generation: u64,
        result: Result<ReadMarker, DeliveryError>,
    },
}

impl Ingress {
    pub(crate) const fn generation(&self) -> u64 {
        match self {
            Self::Polled { generation, .. }
            | Self::Sent { generation, .. }
            | Self::ReactionsRefreshed { generation, .. }
            | Self::ReadPersisted { generation, .. } => *generation,
        }
    }
}

/// What the UI renders for the open channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub channel: Option<ChannelKey>,
    pub messages: Vec<Message>,
    pub typing: Vec<String>,
    pub transport: TransportStatus,
    pub unread: usize,
    pub read_marker: Option<ReadMarker>,
    /// Whether the first load of the channel has completed.
    pub loaded: bool,
    pub revision: u64,
}

impl ChannelSnapshot {
    #[must_use]
    pub fn typing_indicator(&self) -> Option<String> {
        format_typing_indicator(&self.typing)
    }

    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }
}
