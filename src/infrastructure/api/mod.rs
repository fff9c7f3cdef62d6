//! Message store HTTP adapter.

mod client;
pub(crate) mod dto;

pub use client::HttpChatClient;
