//! Domain entity definitions.

mod channel;
mod ids;
mod message;
mod reaction;
mod read_state;
mod token;

pub use channel::{Channel, ChannelKind};
pub use ids::{ChannelId, ChannelKey, CommunityId, MessageId, UserId};
pub use message::{Message, MessageAuthor, MessageKind, MessagePatch, ReplyPreview};
pub use reaction::{ReactionCount, ReactionSet, ReactionSummary, ToggleOutcome};
pub use read_state::ReadMarker;
pub use token::AuthToken;
