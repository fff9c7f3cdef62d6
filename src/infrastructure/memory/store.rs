use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::hub::InMemoryPushHub;
use crate::domain::entities::{
    Channel, ChannelKey, CommunityId, Message, MessageAuthor, MessageId, MessagePatch,
    ReactionSet, UserId,
};
use crate::domain::errors::ApiError;
use crate::domain::ports::{ChatDataPort, PushEvent, SendMessageRequest, TypingAction};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Default)]
struct ChannelLog {
    messages: Vec<Message>,
    reactions: HashMap<MessageId, ReactionSet>,
}

impl ChannelLog {
    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    fn newest_created_at(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(Message::created_at)
    }
}

#[derive(Default)]
struct StoreState {
    directory: HashMap<ChannelKey, Channel>,
    channels: HashMap<ChannelKey, ChannelLog>,
    read_marks: HashMap<(UserId, ChannelKey), DateTime<Utc>>,
}

/// Append-only message store living in process memory.
///
/// Handles created with [`InMemoryMessageStore::for_user`] share the same data
/// and push hub, which is how several local participants are simulated.
#[derive(Clone)]
pub struct InMemoryMessageStore {
    viewer: MessageAuthor,
    state: Arc<Mutex<StoreState>>,
    hub: Arc<InMemoryPushHub>,
    page_size: usize,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new(viewer: MessageAuthor, hub: Arc<InMemoryPushHub>) -> Self {
        Self {
            viewer,
            state: Arc::new(Mutex::new(StoreState::default())),
            hub,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Another participant's view of the same store.
    #[must_use]
    pub fn for_user(&self, user: MessageAuthor) -> Self {
        Self {
            viewer: user,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn hub(&self) -> Arc<InMemoryPushHub> {
        self.hub.clone()
    }

    /// Adds a channel to the directory. Unregistered channels accept any message.
    pub fn register_channel(&self, channel: Channel) {
        self.state.lock().directory.insert(channel.key(), channel);
    }

    /// Registered channels of a community, by position.
    #[must_use]
    pub fn channels(&self, community: &CommunityId) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .state
            .lock()
            .directory
            .values()
            .filter(|c| c.community_id() == community)
            .cloned()
            .collect();
        channels.sort_by_key(Channel::position);
        channels
    }

    /// Appends an existing message without fan-out.
    pub fn seed(&self, channel: &ChannelKey, message: Message) {
        self.state
            .lock()
            .channels
            .entry(channel.clone())
            .or_default()
            .messages
            .push(message);
    }

    /// Replaces a message body and broadcasts the update.
    ///
    /// # Errors
    /// Returns `ApiError::NotFound` for an unknown message.
    pub fn edit_message(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), ApiError> {
        let patch = MessagePatch::edit(content.trim());
        self.modify(channel, message_id, patch.clone())?;
        self.hub.publish(
            channel,
            &PushEvent::MessageUpdated {
                message_id: message_id.clone(),
                patch,
            },
        );
        Ok(())
    }

    /// Soft-deletes a message and broadcasts the deletion.
    ///
    /// # Errors
    /// Returns `ApiError::NotFound` for an unknown message.
    pub fn delete_message(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
    ) -> Result<(), ApiError> {
        self.modify(
            channel,
            message_id,
            MessagePatch {
                is_deleted: Some(true),
                ..MessagePatch::default()
            },
        )?;
        self.hub.publish(
            channel,
            &PushEvent::MessageDeleted {
                message_id: message_id.clone(),
            },
        );
        Ok(())
    }

    /// When this participant last marked the channel read.
    #[must_use]
    pub fn last_read(&self, channel: &ChannelKey) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .read_marks
            .get(&(self.viewer.id.clone(), channel.clone()))
            .copied()
    }

    fn modify(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        patch: MessagePatch,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        let message = state
            .channels
            .get_mut(channel)
            .and_then(|log| log.messages.iter_mut().find(|m| m.id() == message_id))
            .ok_or_else(|| ApiError::not_found("Message not found"))?;
        message.apply(patch);
        Ok(())
    }

    fn with_summary(&self, log: &ChannelLog, message: &Message) -> Message {
        let summary = log
            .reactions
            .get(message.id())
            .map(|set| set.summary_for(&self.viewer.id))
            .unwrap_or_default();
        message.clone().with_reactions(summary)
    }
}

#[async_trait]
impl ChatDataPort for InMemoryMessageStore {
    async fn list_messages(
        &self,
        channel: &ChannelKey,
        after: Option<&MessageId>,
    ) -> Result<Vec<Message>, ApiError> {
        let state = self.state.lock();
        let Some(log) = state.channels.get(channel) else {
            return Ok(Vec::new());
        };

        let visible = |m: &&Message| !m.is_deleted();
        let cursor = after.and_then(|id| log.position(id));

        let messages: Vec<Message> = match cursor {
            Some(index) => log.messages[index + 1..]
                .iter()
                .filter(visible)
                .map(|m| self.with_summary(log, m))
                .collect(),
            None => {
                let recent: Vec<&Message> = log.messages.iter().filter(visible).collect();
                let start = recent.len().saturating_sub(self.page_size);
                recent[start..]
                    .iter()
                    .map(|m| self.with_summary(log, m))
                    .collect()
            }
        };

        drop(state);
        Ok(messages)
    }

    async fn list_messages_since(
        &self,
        channel: &ChannelKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, ApiError> {
        let state = self.state.lock();
        let Some(log) = state.channels.get(channel) else {
            return Ok(Vec::new());
        };

        let messages = log
            .messages
            .iter()
            .filter(|m| !m.is_deleted() && m.created_at() > since)
            .take(self.page_size)
            .map(|m| self.with_summary(log, m))
            .collect();

        drop(state);
        Ok(messages)
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ApiError> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(ApiError::validation("Message content is required"));
        }

        let message = {
            let mut state = self.state.lock();
            if let Some(channel) = state.directory.get(&request.channel)
                && !channel.kind().is_text_based()
            {
                return Err(ApiError::validation(format!(
                    "{} does not accept messages",
                    channel.display_name()
                )));
            }

            let log = state.channels.entry(request.channel.clone()).or_default();

            let reply_to = match &request.reply_to {
                Some(id) => {
                    let index = log
                        .position(id)
                        .ok_or_else(|| ApiError::not_found("Reply target not found"))?;
                    Some(log.messages[index].as_reply_preview())
                }
                None => None,
            };

            let now = Utc::now();
            let created_at = log.newest_created_at().map_or(now, |newest| newest.max(now));

            let message = Message::new(
                MessageId::new(Uuid::new_v4().to_string()),
                request.channel.channel.clone(),
                self.viewer.clone(),
                content,
                created_at,
            )
            .with_reply_to(reply_to);

            log.messages.push(message.clone());
            message
        };

        debug!(channel = %request.channel, message_id = %message.id(), "Loopback message stored");
        self.hub.publish(
            &request.channel,
            &PushEvent::NewMessage {
                message: message.clone(),
            },
        );
        Ok(message)
    }

    async fn toggle_reaction(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(ApiError::validation("Emoji is required"));
        }

        let mut state = self.state.lock();
        let log = state
            .channels
            .get_mut(channel)
            .filter(|log| log.position(message_id).is_some())
            .ok_or_else(|| ApiError::not_found("Message not found"))?;

        let outcome = log
            .reactions
            .entry(message_id.clone())
            .or_default()
            .toggle(&self.viewer.id, emoji);

        debug!(message_id = %message_id, emoji, outcome = ?outcome, "Loopback reaction toggled");
        Ok(())
    }

    async fn send_typing(
        &self,
        channel: &ChannelKey,
        action: TypingAction,
    ) -> Result<(), ApiError> {
        let event = match action {
            TypingAction::Start => PushEvent::UserTyping {
                user_id: self.viewer.id.clone(),
                user_name: self.viewer.name.clone(),
            },
            TypingAction::Stop => PushEvent::UserStoppedTyping {
                user_id: self.viewer.id.clone(),
            },
        };
        self.hub.publish(channel, &event);
        Ok(())
    }

    async fn mark_read(&self, channel: &ChannelKey) -> Result<(), ApiError> {
        self.state
            .lock()
            .read_marks
            .insert((self.viewer.id.clone(), channel.clone()), Utc::now());
        info!(channel = %channel, user = %self.viewer.id, "Loopback channel marked read");
        Ok(())
    }
}
