//! Local fallback cache for read markers.

use std::collections::HashMap;

use crate::domain::entities::{ChannelKey, ReadMarker};
use crate::domain::errors::CacheError;

/// Best-effort local store of read markers, keyed by channel.
///
/// Implementations keep the newest marker per channel; storing an older
/// marker than the one held is a no-op.
#[cfg_attr(test, mockall::automock)]
pub trait ReadCachePort: Send + Sync {
    /// Loads every cached marker.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache cannot be read.
    fn load_all(&self) -> Result<HashMap<ChannelKey, ReadMarker>, CacheError>;

    /// Loads the marker of one channel.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache cannot be read.
    fn get(&self, key: &ChannelKey) -> Result<Option<ReadMarker>, CacheError>;

    /// Records a marker for one channel.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache cannot be written.
    fn store(&self, key: &ChannelKey, marker: ReadMarker) -> Result<(), CacheError>;
}
