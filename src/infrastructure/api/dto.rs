//! Wire types of the message store API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    ChannelId, Message, MessageAuthor, MessageId, MessageKind, MessagePatch, ReactionCount,
    ReactionSummary, ReplyPreview, UserId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorDto {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyAuthorDto {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyDto {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
    pub author: ReplyAuthorDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDto {
    pub emoji: String,
    pub count: u32,
    #[serde(default)]
    pub user_reacted: bool,
}

/// Message as returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub author: AuthorDto,
    #[serde(default)]
    pub reply_to: Option<ReplyDto>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<ReactionDto>,
}

impl MessageDto {
    /// Converts to the domain message. The wire format omits the channel.
    #[must_use]
    pub fn into_message(self, channel: &ChannelId) -> Message {
        let kind = self
            .kind
            .as_deref()
            .map_or(MessageKind::Text, MessageKind::parse);

        let author = MessageAuthor {
            id: self.author.id,
            name: self.author.name,
            image: self.author.image,
        };

        let reply_to = self.reply_to.map(|reply| ReplyPreview {
            id: reply.id,
            content: reply.content,
            author_id: reply.author.id,
            author_name: reply.author.name,
        });

        Message::new(self.id, channel.clone(), author, self.content, self.created_at)
            .with_kind(kind)
            .with_reply_to(reply_to)
            .with_flags(self.is_edited, self.is_deleted)
            .with_reactions(reactions_from_wire(self.reactions))
    }

    /// Builds the wire form of a domain message.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.id().clone(),
            content: message.content().to_string(),
            kind: Some(kind_to_wire(message.kind()).to_string()),
            author: AuthorDto {
                id: message.author().id.clone(),
                name: message.author().name.clone(),
                image: message.author().image.clone(),
            },
            reply_to: message.reply_to().map(|reply| ReplyDto {
                id: reply.id.clone(),
                content: reply.content.clone(),
                author: ReplyAuthorDto {
                    id: reply.author_id.clone(),
                    name: reply.author_name.clone(),
                },
            }),
            is_edited: message.is_edited(),
            is_deleted: message.is_deleted(),
            created_at: message.created_at(),
            reactions: message
                .reactions()
                .iter()
                .map(|r| ReactionDto {
                    emoji: r.emoji.clone(),
                    count: r.count,
                    user_reacted: r.reacted,
                })
                .collect(),
        }
    }
}

/// Partial update carried by `message-updated`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdatesDto {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_edited: Option<bool>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
    #[serde(default)]
    pub reactions: Option<Vec<ReactionDto>>,
}

impl From<MessageUpdatesDto> for MessagePatch {
    fn from(dto: MessageUpdatesDto) -> Self {
        Self {
            content: dto.content,
            is_edited: dto.is_edited,
            is_deleted: dto.is_deleted,
            reactions: dto.reactions.map(reactions_from_wire),
        }
    }
}

impl From<&MessagePatch> for MessageUpdatesDto {
    fn from(patch: &MessagePatch) -> Self {
        Self {
            content: patch.content.clone(),
            is_edited: patch.is_edited,
            is_deleted: patch.is_deleted,
            reactions: patch.reactions.as_ref().map(|summary| {
                summary
                    .iter()
                    .map(|r| ReactionDto {
                        emoji: r.emoji.clone(),
                        count: r.count,
                        user_reacted: r.reacted,
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesEnvelope {
    #[serde(default)]
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Deserialize)]
pub struct MessageEnvelope {
    pub message: MessageDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<&'a MessageId>,
}

#[derive(Debug, Serialize)]
pub struct ReactionBody<'a> {
    pub emoji: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TypingBody {
    pub action: &'static str,
}

/// Error body returned by the store.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "message")]
    pub error: String,
}

fn reactions_from_wire(reactions: Vec<ReactionDto>) -> ReactionSummary {
    ReactionSummary::new(
        reactions
            .into_iter()
            .map(|r| ReactionCount {
                emoji: r.emoji,
                count: r.count,
                reacted: r.user_reacted,
            })
            .collect(),
    )
}

const fn kind_to_wire(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "text",
        MessageKind::Image => "image",
        MessageKind::File => "file",
        MessageKind::System => "system",
    }
}
