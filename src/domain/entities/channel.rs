//! Community channel entity.

use serde::{Deserialize, Serialize};

use super::{ChannelId, ChannelKey, CommunityId};

/// Channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Plain text channel.
    #[default]
    Text,
    /// Voice channel.
    Voice,
    /// Announcement channel.
    Announcement,
}

impl ChannelKind {
    /// Returns true if this channel type carries a message timeline.
    #[must_use]
    pub const fn is_text_based(self) -> bool {
        matches!(self, Self::Text | Self::Announcement)
    }
}

/// A named channel scoped to a community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    id: ChannelId,
    community_id: CommunityId,
    name: String,
    kind: ChannelKind,
    is_private: bool,
    position: i32,
}

impl Channel {
    /// Creates a public text channel.
    #[must_use]
    pub fn new(id: ChannelId, community_id: CommunityId, name: impl Into<String>) -> Self {
        Self {
            id,
            community_id,
            name: name.into(),
            kind: ChannelKind::Text,
            is_private: false,
            position: 0,
        }
    }

    /// Sets channel kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets privacy flag.
    #[must_use]
    pub const fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    /// Sets ordering rank.
    #[must_use]
    pub const fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// Returns the channel id.
    #[must_use]
    pub const fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Returns the owning community id.
    #[must_use]
    pub const fn community_id(&self) -> &CommunityId {
        &self.community_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the channel type.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns true for private channels.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.is_private
    }

    /// Returns the ordering rank.
    #[must_use]
    pub const fn position(&self) -> i32 {
        self.position
    }

    /// Returns the fully qualified key of this channel.
    #[must_use]
    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(self.community_id.clone(), self.id.clone())
    }

    /// Display label, `#name`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("#{}", self.name)
    }
}
