//! Domain layer with core entities, errors, ports and pure services.

/// Transport status definitions.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Pure domain services.
pub mod services;

pub use connection::TransportStatus;
pub use entities::{ChannelKey, Message, MessageId, UserId};
pub use errors::{ApiError, DeliveryError};
pub use ports::{ChatDataPort, PushPort, ReadCachePort};
