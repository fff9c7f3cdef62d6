//! WebSocket push adapter (Pusher protocol).

mod client;
mod codec;
mod connection;
mod constants;
mod error;
mod heartbeat;
mod state;

pub use client::{PushClient, PushClientConfig};
pub use codec::{PushCodec, PushFrame, ServerMessage};
pub use connection::{Connector, PushConnection, WebSocketConnection};
pub use constants::{DEFAULT_PUSH_URL, DEFAULT_TOPIC_PREFIX, MAX_RECONNECT_ATTEMPTS};
pub use error::{PushError, PushErrorCode, PushResult};
pub use state::ConnectionState;
