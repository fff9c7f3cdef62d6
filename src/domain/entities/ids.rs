//! Opaque identifiers shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a community that owns channels.
    CommunityId
);
string_id!(
    /// Identifier of a channel inside a community.
    ChannelId
);
string_id!(
    /// Globally unique message identifier.
    MessageId
);
string_id!(
    /// Identifier of a member account.
    UserId
);

/// Fully qualified channel address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    /// Owning community.
    pub community: CommunityId,
    /// Channel within the community.
    pub channel: ChannelId,
}

impl ChannelKey {
    /// Creates a channel key.
    #[must_use]
    pub fn new(community: impl Into<CommunityId>, channel: impl Into<ChannelId>) -> Self {
        Self {
            community: community.into(),
            channel: channel.into(),
        }
    }

    /// Key used by the local read-marker cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.community, self.channel)
    }

    /// Parses a cache key written without its parts.
    ///
    /// Ids may contain `-` themselves, so only a key with exactly one dash
    /// splits unambiguously.
    #[must_use]
    pub fn from_cache_key(value: &str) -> Option<Self> {
        let (community, channel) = value.split_once('-')?;
        if community.is_empty() || channel.is_empty() || channel.contains('-') {
            return None;
        }
        Some(Self::new(community, channel))
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.community, self.channel)
    }
}
