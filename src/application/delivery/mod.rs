//! Delivery coordinator: one deduplicated, ordered view of the open channel
//! fed by a push subscription and a poll loop.

mod config;
mod coordinator;
mod events;
mod session;
mod worker;

#[cfg(test)]
mod coordinator_test;

pub use config::{
    DEFAULT_POLL_INTERVAL, DEFAULT_READ_DWELL, DEFAULT_REMOTE_TYPING_TTL, DEFAULT_TYPING_IDLE,
    DeliveryConfig,
};
pub use coordinator::DeliveryCoordinator;
pub use events::{ChannelSnapshot, CoordinatorCommand};
