//! Loopback store and push hub for local runs.

mod hub;
mod store;

pub use hub::InMemoryPushHub;
pub use store::{DEFAULT_PAGE_SIZE, InMemoryMessageStore};
