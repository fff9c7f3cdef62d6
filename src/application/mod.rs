//! Application layer: channel-view services and the delivery coordinator.

/// Delivery coordinator.
pub mod delivery;
/// Channel-view services.
pub mod services;

pub use delivery::{ChannelSnapshot, DeliveryConfig, DeliveryCoordinator};
pub use services::{MessageTimeline, ReactionAggregator, ReadStateTracker};
