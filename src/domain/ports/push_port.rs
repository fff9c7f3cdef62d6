use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::entities::{ChannelKey, Message, MessageId, MessagePatch, UserId};
use crate::domain::errors::DeliveryError;

/// Event delivered on a channel subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    NewMessage {
        message: Message,
    },
    MessageUpdated {
        message_id: MessageId,
        patch: MessagePatch,
    },
    MessageDeleted {
        message_id: MessageId,
    },
    UserTyping {
        user_id: UserId,
        user_name: String,
    },
    UserStoppedTyping {
        user_id: UserId,
    },
    /// The underlying transport is (again) delivering events.
    TransportUp,
    /// The underlying transport dropped; events may be missed until it recovers.
    TransportDown {
        reason: String,
    },
}

impl PushEvent {
    #[must_use]
    pub const fn is_message_event(&self) -> bool {
        matches!(
            self,
            Self::NewMessage { .. } | Self::MessageUpdated { .. } | Self::MessageDeleted { .. }
        )
    }

    #[must_use]
    pub const fn is_typing_event(&self) -> bool {
        matches!(self, Self::UserTyping { .. } | Self::UserStoppedTyping { .. })
    }

    #[must_use]
    pub const fn is_transport_event(&self) -> bool {
        matches!(self, Self::TransportUp | Self::TransportDown { .. })
    }
}

/// Port for per-channel push subscriptions.
#[async_trait]
pub trait PushPort: Send + Sync {
    /// Opens a subscription for one channel.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::PushUnavailable` if the subscription cannot be
    /// established. Callers fall back to polling.
    async fn subscribe(
        &self,
        channel: &ChannelKey,
    ) -> Result<mpsc::UnboundedReceiver<PushEvent>, DeliveryError>;

    /// Closes the subscription for one channel. Unknown channels are ignored.
    async fn unsubscribe(&self, channel: &ChannelKey);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        assert!(
            PushEvent::MessageDeleted {
                message_id: "m1".into()
            }
            .is_message_event()
        );
        assert!(
            PushEvent::UserStoppedTyping {
                user_id: "u1".into()
            }
            .is_typing_event()
        );
        assert!(PushEvent::TransportUp.is_transport_event());
        assert!(!PushEvent::TransportUp.is_message_event());
    }
}
