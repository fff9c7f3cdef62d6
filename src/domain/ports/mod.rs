mod chat_data_port;
mod push_port;
mod read_cache_port;

pub use chat_data_port::{ChatDataPort, SendMessageRequest, TypingAction};
pub use push_port::{PushEvent, PushPort};
pub use read_cache_port::ReadCachePort;

#[cfg(test)]
pub use read_cache_port::MockReadCachePort;

#[cfg(test)]
pub mod mocks {
    pub use super::chat_data_port::mock::MockChatData;
    pub use super::push_port::mock::MockPush;
}
