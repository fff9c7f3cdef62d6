//! Pure domain services.

mod unread;

pub use unread::{UNMARKED_LOOKBACK, UnreadCounter};
