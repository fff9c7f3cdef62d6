//! Message store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{ChannelKey, Message, MessageId};
use crate::domain::errors::ApiError;

/// Request to append a message to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub channel: ChannelKey,
    pub content: String,
    pub reply_to: Option<MessageId>,
}

impl SendMessageRequest {
    #[must_use]
    pub fn new(channel: ChannelKey, content: impl Into<String>) -> Self {
        Self {
            channel,
            content: content.into(),
            reply_to: None,
        }
    }

    #[must_use]
    pub fn with_reply(mut self, message_id: Option<MessageId>) -> Self {
        self.reply_to = message_id;
        self
    }
}

/// Typing signal sent to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypingAction {
    Start,
    Stop,
}

impl TypingAction {
    /// Wire value of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

/// Port for the durable message store.
#[async_trait]
pub trait ChatDataPort: Send + Sync {
    /// Lists messages in ascending order.
    ///
    /// Without `after` the most recent window is returned; with it only
    /// messages strictly newer than that message.
    async fn list_messages(
        &self,
        channel: &ChannelKey,
        after: Option<&MessageId>,
    ) -> Result<Vec<Message>, ApiError>;

    /// Lists up to one page of messages created strictly after `since`, oldest
    /// first.
    ///
    /// Unlike the id cursor this reaches messages that have already scrolled
    /// out of the recent window.
    async fn list_messages_since(
        &self,
        channel: &ChannelKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, ApiError>;

    /// Appends a message and returns the stored copy.
    async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ApiError>;

    /// Adds the viewer's reaction or removes it if already present.
    async fn toggle_reaction(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ApiError>;

    /// Broadcasts a typing signal.
    async fn send_typing(&self, channel: &ChannelKey, action: TypingAction)
    -> Result<(), ApiError>;

    /// Records that the viewer has read the channel up to now.
    async fn mark_read(&self, channel: &ChannelKey) -> Result<(), ApiError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use chrono::Duration;
    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    use crate::domain::entities::{ChannelId, MessageAuthor, ReactionSet, UserId};

    /// Scriptable message store for testing.
    ///
    /// Messages are filed under their own channel id; the community part of a
    /// key is ignored.
    pub struct MockChatData {
        viewer: UserId,
        messages: Arc<Mutex<Vec<Message>>>,
        reactions: Arc<Mutex<Vec<(MessageId, ReactionSet)>>>,
        typing: Arc<Mutex<Vec<TypingAction>>>,
        list_calls: Arc<Mutex<Vec<Option<MessageId>>>>,
        since_calls: Arc<Mutex<Vec<DateTime<Utc>>>>,
        read_gates: Mutex<HashMap<ChannelId, Arc<Semaphore>>>,
        read_marks: AtomicUsize,
        sent: AtomicUsize,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MockChatData {
        /// Creates an empty store viewed by `viewer`.
        pub fn new(viewer: impl Into<UserId>) -> Self {
            Self {
                viewer: viewer.into(),
                messages: Arc::new(Mutex::new(Vec::new())),
                reactions: Arc::new(Mutex::new(Vec::new())),
                typing: Arc::new(Mutex::new(Vec::new())),
                list_calls: Arc::new(Mutex::new(Vec::new())),
                since_calls: Arc::new(Mutex::new(Vec::new())),
                read_gates: Mutex::new(HashMap::new()),
                read_marks: AtomicUsize::new(0),
                sent: AtomicUsize::new(0),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }
        }

        /// Appends a stored message as if written elsewhere.
        pub fn seed(&self, message: Message) {
            self.messages.lock().push(message);
        }

        /// Makes list calls fail.
        pub fn set_fail_reads(&self, value: bool) {
            self.fail_reads.store(value, Ordering::SeqCst);
        }

        /// Holds list results for `channel` until [`Self::release_reads`].
        ///
        /// The result is taken when the call arrives, so a held call answers
        /// with the contents of that moment.
        pub fn hold_reads(&self, channel: &ChannelKey) {
            self.read_gates
                .lock()
                .insert(channel.channel.clone(), Arc::new(Semaphore::new(0)));
        }

        /// Lets held list calls for `channel` return.
        pub fn release_reads(&self, channel: &ChannelKey) {
            if let Some(gate) = self.read_gates.lock().remove(&channel.channel) {
                gate.close();
            }
        }

        /// Makes write calls fail.
        pub fn set_fail_writes(&self, value: bool) {
            self.fail_writes.store(value, Ordering::SeqCst);
        }

        /// Typing actions received so far.
        pub fn typing_actions(&self) -> Vec<TypingAction> {
            self.typing.lock().clone()
        }

        /// Cursors of every list call so far.
        pub fn list_calls(&self) -> Vec<Option<MessageId>> {
            self.list_calls.lock().clone()
        }

        /// Lower bounds of every timestamp-bounded list call so far.
        pub fn since_calls(&self) -> Vec<DateTime<Utc>> {
            self.since_calls.lock().clone()
        }

        /// Number of successful mark-read calls.
        pub fn read_marks(&self) -> usize {
            self.read_marks.load(Ordering::SeqCst)
        }

        fn check_write(&self) -> Result<(), ApiError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(ApiError::network("mock write failure"))
            } else {
                Ok(())
            }
        }

        fn with_summary(&self, message: &Message) -> Message {
            let reactions = self.reactions.lock();
            let summary = reactions
                .iter()
                .find(|(id, _)| id == message.id())
                .map(|(_, set)| set.summary_for(&self.viewer))
                .unwrap_or_default();
            message.clone().with_reactions(summary)
        }
    }

    #[async_trait]
    impl ChatDataPort for MockChatData {
        async fn list_messages(
            &self,
            channel: &ChannelKey,
            after: Option<&MessageId>,
        ) -> Result<Vec<Message>, ApiError> {
            self.list_calls.lock().push(after.cloned());
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(ApiError::network("mock read failure"));
            }

            let messages: Vec<Message> = self
                .messages
                .lock()
                .iter()
                .filter(|m| *m.channel_id() == channel.channel)
                .cloned()
                .collect();
            let start = after
                .and_then(|id| messages.iter().position(|m| m.id() == id))
                .map_or(0, |index| index + 1);
            let listed: Vec<Message> = messages[start..]
                .iter()
                .map(|m| self.with_summary(m))
                .collect();

            let gate = self.read_gates.lock().get(&channel.channel).cloned();
            if let Some(gate) = gate {
                let _ = gate.acquire().await;
            }
            Ok(listed)
        }

        async fn list_messages_since(
            &self,
            channel: &ChannelKey,
            since: DateTime<Utc>,
        ) -> Result<Vec<Message>, ApiError> {
            self.since_calls.lock().push(since);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(ApiError::network("mock read failure"));
            }

            Ok(self
                .messages
                .lock()
                .iter()
                .filter(|m| *m.channel_id() == channel.channel && m.created_at() > since)
                .map(|m| self.with_summary(m))
                .collect())
        }

        async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ApiError> {
            self.check_write()?;
            if request.content.trim().is_empty() {
                return Err(ApiError::validation("Message content is required"));
            }

            let n = self.sent.fetch_add(1, Ordering::SeqCst);
            let created_at = self
                .messages
                .lock()
                .last()
                .map_or_else(Utc::now, |m| m.created_at() + Duration::milliseconds(1));
            let message = Message::new(
                MessageId::new(format!("sent-{n}")),
                request.channel.channel.clone(),
                MessageAuthor::new(self.viewer.clone(), "Me"),
                request.content,
                created_at,
            );
            self.messages.lock().push(message.clone());
            Ok(message)
        }

        async fn toggle_reaction(
            &self,
            _channel: &ChannelKey,
            message_id: &MessageId,
            emoji: &str,
        ) -> Result<(), ApiError> {
            self.check_write()?;
            let mut reactions = self.reactions.lock();
            if let Some((_, set)) = reactions.iter_mut().find(|(id, _)| id == message_id) {
                set.toggle(&self.viewer, emoji);
            } else {
                let mut set = ReactionSet::new();
                set.toggle(&self.viewer, emoji);
                reactions.push((message_id.clone(), set));
            }
            Ok(())
        }

        async fn send_typing(
            &self,
            _channel: &ChannelKey,
            action: TypingAction,
        ) -> Result<(), ApiError> {
            self.typing.lock().push(action);
            Ok(())
        }

        async fn mark_read(&self, _channel: &ChannelKey) -> Result<(), ApiError> {
            self.check_write()?;
            self.read_marks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
