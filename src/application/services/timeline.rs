//! Ordered, duplicate-free message list for one channel.
//!
//! Every delivery path (push, poll, send acknowledgement, initial load)
//! funnels through [`MessageTimeline::insert`], so a message id is held at
//! most once no matter how many paths deliver it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::domain::entities::{Message, MessageId, MessagePatch, ReactionSummary};

/// Result of offering a message to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Duplicate,
}

impl MergeOutcome {
    #[must_use]
    pub const fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MessageTimeline {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageTimeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a message at its timestamp position.
    ///
    /// Equal timestamps keep arrival order. Already-known ids are dropped.
    pub fn insert(&mut self, message: Message) -> MergeOutcome {
        if self.ids.contains(message.id()) {
            trace!(message_id = %message.id(), "Dropping duplicate delivery");
            return MergeOutcome::Duplicate;
        }

        let created_at = message.created_at();
        let position = self
            .messages
            .partition_point(|m| m.created_at() <= created_at);

        self.ids.insert(message.id().clone());
        self.messages.insert(position, message);
        MergeOutcome::Inserted
    }

    /// Merges a batch in the order given. Returns how many were new.
    pub fn merge_batch(&mut self, batch: impl IntoIterator<Item = Message>) -> usize {
        batch
            .into_iter()
            .map(|m| self.insert(m))
            .filter(|outcome| outcome.is_inserted())
            .count()
    }

    /// Applies a partial update in place. Returns false for unknown ids.
    pub fn apply_patch(&mut self, id: &MessageId, patch: MessagePatch) -> bool {
        match self.messages.iter_mut().find(|m| m.id() == id) {
            Some(message) => {
                message.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Soft-deletes a message in place. Returns false for unknown ids.
    pub fn mark_deleted(&mut self, id: &MessageId) -> bool {
        match self.messages.iter_mut().find(|m| m.id() == id) {
            Some(message) => {
                message.mark_deleted();
                true
            }
            None => false,
        }
    }

    /// Replaces reaction summaries of the messages present in `refreshed`.
    ///
    /// Messages not held locally are ignored. Returns how many changed.
    pub fn refresh_reactions<'a>(
        &mut self,
        refreshed: impl IntoIterator<Item = (&'a MessageId, &'a ReactionSummary)>,
    ) -> usize {
        let mut changed = 0;
        for (id, summary) in refreshed {
            if let Some(message) = self.messages.iter_mut().find(|m| m.id() == id)
                && message.reactions() != summary
            {
                message.set_reactions(summary.clone());
                changed += 1;
            }
        }
        changed
    }

    /// Id of the most recent message held; the poll cursor.
    #[must_use]
    pub fn last_known_id(&self) -> Option<&MessageId> {
        self.messages.last().map(Message::id)
    }

    /// Creation time of the most recent message held.
    #[must_use]
    pub fn newest_created_at(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(Message::created_at)
    }

    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }
}
