//! Channel message entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, MessageId, ReactionSummary, UserId};

/// Message content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// Image upload.
    Image,
    /// File upload.
    File,
    /// System notice.
    System,
}

impl MessageKind {
    /// Parses a wire value; unknown values are treated as text.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "image" => Self::Image,
            "file" => Self::File,
            "system" => Self::System,
            _ => Self::Text,
        }
    }
}

/// Author information embedded in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuthor {
    /// Author id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub image: Option<String>,
}

impl MessageAuthor {
    /// Creates an author without an avatar.
    #[must_use]
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: None,
        }
    }
}

/// Preview of the message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPreview {
    /// Referenced message id.
    pub id: MessageId,
    /// Referenced message body.
    pub content: String,
    /// Referenced message author id.
    pub author_id: UserId,
    /// Referenced message author name.
    pub author_name: String,
}

/// Partial update applied to an existing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    /// New body.
    pub content: Option<String>,
    /// New edited flag.
    pub is_edited: Option<bool>,
    /// New soft-deleted flag.
    pub is_deleted: Option<bool>,
    /// Replacement reaction summary.
    pub reactions: Option<ReactionSummary>,
}

impl MessagePatch {
    /// Patch for an edited body.
    #[must_use]
    pub fn edit(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_edited: Some(true),
            ..Self::default()
        }
    }

    /// Patch that only replaces reactions.
    #[must_use]
    pub fn reactions(reactions: ReactionSummary) -> Self {
        Self {
            reactions: Some(reactions),
            ..Self::default()
        }
    }

    /// Returns true when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.is_edited.is_none()
            && self.is_deleted.is_none()
            && self.reactions.is_none()
    }
}

/// A message in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    channel_id: ChannelId,
    author: MessageAuthor,
    content: String,
    kind: MessageKind,
    reply_to: Option<ReplyPreview>,
    is_edited: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    reactions: ReactionSummary,
}

impl Message {
    /// Creates a plain text message.
    #[must_use]
    pub fn new(
        id: MessageId,
        channel_id: ChannelId,
        author: MessageAuthor,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            channel_id,
            author,
            content: content.into(),
            kind: MessageKind::Text,
            reply_to: None,
            is_edited: false,
            is_deleted: false,
            created_at,
            reactions: ReactionSummary::empty(),
        }
    }

    /// Sets content type.
    #[must_use]
    pub const fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets reply preview.
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: Option<ReplyPreview>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Sets edited and deleted flags.
    #[must_use]
    pub const fn with_flags(mut self, is_edited: bool, is_deleted: bool) -> Self {
        self.is_edited = is_edited;
        self.is_deleted = is_deleted;
        self
    }

    /// Sets reaction summary.
    #[must_use]
    pub fn with_reactions(mut self, reactions: ReactionSummary) -> Self {
        self.reactions = reactions;
        self
    }

    /// Returns the message id.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    /// Returns the channel id.
    #[must_use]
    pub const fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Returns the author.
    #[must_use]
    pub const fn author(&self) -> &MessageAuthor {
        &self.author
    }

    /// Returns the body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the content type.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the reply preview.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&ReplyPreview> {
        self.reply_to.as_ref()
    }

    /// Whether the body was edited.
    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.is_edited
    }

    /// Whether the message was soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Reaction summary.
    #[must_use]
    pub const fn reactions(&self) -> &ReactionSummary {
        &self.reactions
    }

    /// Replaces the reaction summary.
    pub fn set_reactions(&mut self, reactions: ReactionSummary) {
        self.reactions = reactions;
    }

    /// Marks the message as soft-deleted.
    pub const fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Applies a partial update. Identity and timestamp never change.
    pub fn apply(&mut self, patch: MessagePatch) {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(is_edited) = patch.is_edited {
            self.is_edited = is_edited;
        }
        if let Some(is_deleted) = patch.is_deleted {
            self.is_deleted = is_deleted;
        }
        if let Some(reactions) = patch.reactions {
            self.reactions = reactions;
        }
    }

    /// Whether `viewer` wrote this message.
    #[must_use]
    pub fn is_authored_by(&self, viewer: &UserId) -> bool {
        &self.author.id == viewer
    }

    /// Reply preview of this message, for messages that quote it.
    #[must_use]
    pub fn as_reply_preview(&self) -> ReplyPreview {
        ReplyPreview {
            id: self.id.clone(),
            content: self.content.clone(),
            author_id: self.author.id.clone(),
            author_name: self.author.name.clone(),
        }
    }

    /// Formatted timestamp for display.
    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}
