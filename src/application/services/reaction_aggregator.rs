use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::domain::entities::{ChannelKey, MessageId, ReactionSummary};
use crate::domain::errors::{ApiError, DeliveryError};
use crate::domain::ports::ChatDataPort;

/// Authoritative reaction state after a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRefresh {
    /// Summary of the toggled message.
    pub target: ReactionSummary,
    /// Summaries of every message the refresh read.
    pub summaries: Vec<(MessageId, ReactionSummary)>,
}

/// Toggles reactions and re-reads counts from the store.
///
/// Counts are never adjusted locally; the refreshed summaries are the only
/// source the view applies.
#[derive(Clone)]
pub struct ReactionAggregator {
    store: Arc<dyn ChatDataPort>,
}

impl ReactionAggregator {
    #[must_use]
    pub const fn new(store: Arc<dyn ChatDataPort>) -> Self {
        Self { store }
    }

    /// Toggles the viewer's `emoji` on a message, then refreshes.
    ///
    /// `posted_at` is the message's creation time when the caller knows it.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Write` if the toggle was not persisted and
    /// `DeliveryError::Transport` if it was but the refresh failed.
    pub async fn toggle(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        posted_at: Option<DateTime<Utc>>,
        emoji: &str,
    ) -> Result<ReactionRefresh, DeliveryError> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(DeliveryError::write(
                "toggle reaction",
                ApiError::validation("Emoji is required"),
            ));
        }

        self.store
            .toggle_reaction(channel, message_id, emoji)
            .await
            .map_err(|e| {
                warn!(channel = %channel, message_id = %message_id, error = %e, "Reaction toggle failed");
                DeliveryError::write("toggle reaction", e)
            })?;

        debug!(channel = %channel, message_id = %message_id, emoji, "Reaction toggled, refreshing");
        self.refresh(channel, message_id, posted_at).await
    }

    /// Reads the current summaries starting at the message.
    ///
    /// With a known `posted_at` the read begins just before the message, so it
    /// is covered however many messages arrived after it. Otherwise the recent
    /// window is read.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Transport` if the store cannot be read.
    pub async fn refresh(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<ReactionRefresh, DeliveryError> {
        let read = match posted_at {
            Some(posted_at) => {
                let since = posted_at - Duration::milliseconds(1);
                self.store.list_messages_since(channel, since).await
            }
            None => self.store.list_messages(channel, None).await,
        };
        let messages = read.map_err(|e| DeliveryError::transport("refresh reactions", e))?;

        let target = messages
            .iter()
            .find(|m| m.id() == message_id)
            .map(|m| m.reactions().clone())
            .unwrap_or_default();

        let summaries = messages
            .into_iter()
            .map(|m| (m.id().clone(), m.reactions().clone()))
            .collect();

        Ok(ReactionRefresh { target, summaries })
    }
}
