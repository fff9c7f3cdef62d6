use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::entities::ChannelKey;
use crate::domain::errors::DeliveryError;
use crate::domain::ports::{PushEvent, PushPort};

/// In-process push fan-out paired with `InMemoryMessageStore`.
///
/// Subscriptions are live immediately; there is no transport to lose.
#[derive(Default)]
pub struct InMemoryPushHub {
    subscribers: Mutex<HashMap<ChannelKey, Vec<mpsc::UnboundedSender<PushEvent>>>>,
}

impl InMemoryPushHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an event to every open subscription of `channel`.
    /// Returns how many subscribers received it.
    pub fn publish(&self, channel: &ChannelKey, event: &PushEvent) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(senders) = subscribers.get_mut(channel) else {
            return 0;
        };

        senders.retain(|tx| tx.send(event.clone()).is_ok());
        let delivered = senders.len();
        if senders.is_empty() {
            subscribers.remove(channel);
        }

        trace!(channel = %channel, delivered, "Published loopback event");
        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self, channel: &ChannelKey) -> usize {
        self.subscribers
            .lock()
            .get(channel)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }
}

#[async_trait]
impl PushPort for InMemoryPushHub {
    async fn subscribe(
        &self,
        channel: &ChannelKey,
    ) -> Result<mpsc::UnboundedReceiver<PushEvent>, DeliveryError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(PushEvent::TransportUp);

        self.subscribers
            .lock()
            .entry(channel.clone())
            .or_default()
            .push(tx);

        debug!(channel = %channel, "Loopback subscription opened");
        Ok(rx)
    }

    async fn unsubscribe(&self, channel: &ChannelKey) {
        let mut subscribers = self.subscribers.lock();
        if let Some(senders) = subscribers.get_mut(channel) {
            senders.retain(|tx| !tx.is_closed());
            if senders.is_empty() {
                subscribers.remove(channel);
            }
        }
    }
}
