//! Channel-view services composed by the delivery coordinator.

pub mod reaction_aggregator;
pub mod read_state_tracker;
pub mod timeline;
pub mod timers;
pub mod typing_tracker;

pub use reaction_aggregator::{ReactionAggregator, ReactionRefresh};
pub use read_state_tracker::ReadStateTracker;
pub use timeline::{MergeOutcome, MessageTimeline};
pub use timers::{TimerArena, TimerKind};
pub use typing_tracker::{LocalTyping, RemoteTypingSet, TYPING_IDLE_TIMEOUT, format_typing_indicator};
