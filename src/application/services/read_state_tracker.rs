//! Per-channel read markers for the viewer.
//!
//! The in-memory marker is authoritative for the client's own badges. It is
//! mirrored to a local cache and to the durable store; a failed durable write
//! leaves the local value in charge until the next reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::entities::{ChannelId, ChannelKey, CommunityId, Message, ReadMarker, UserId};
use crate::domain::errors::DeliveryError;
use crate::domain::ports::{ChatDataPort, ReadCachePort};
use crate::domain::services::UnreadCounter;

pub struct ReadStateTracker {
    viewer: UserId,
    markers: Mutex<HashMap<ChannelKey, ReadMarker>>,
    store: Arc<dyn ChatDataPort>,
    cache: Arc<dyn ReadCachePort>,
}

impl ReadStateTracker {
    #[must_use]
    pub fn new(viewer: UserId, store: Arc<dyn ChatDataPort>, cache: Arc<dyn ReadCachePort>) -> Self {
        Self {
            viewer,
            markers: Mutex::new(HashMap::new()),
            store,
            cache,
        }
    }

    #[must_use]
    pub const fn viewer(&self) -> &UserId {
        &self.viewer
    }

    /// Seeds markers from the local cache. Returns how many were loaded.
    pub fn hydrate(&self) -> usize {
        match self.cache.load_all() {
            Ok(cached) => {
                let count = cached.len();
                for (key, marker) in cached {
                    self.reconcile(&key, Some(marker));
                }
                info!(count, "Loaded cached read markers");
                count
            }
            Err(e) => {
                warn!(error = %e, "Read marker cache unavailable, starting empty");
                0
            }
        }
    }

    #[must_use]
    pub fn marker(&self, key: &ChannelKey) -> Option<ReadMarker> {
        self.markers.lock().get(key).copied()
    }

    /// Moves the in-memory marker forward. Returns false if it was already newer.
    pub fn advance_local(&self, key: &ChannelKey, candidate: ReadMarker) -> bool {
        let mut markers = self.markers.lock();
        match markers.get_mut(key) {
            Some(current) => current.advance(candidate),
            None => {
                markers.insert(key.clone(), candidate);
                true
            }
        }
    }

    /// Merges an externally known marker, newest wins. Returns the result.
    pub fn reconcile(&self, key: &ChannelKey, other: Option<ReadMarker>) -> Option<ReadMarker> {
        let mut markers = self.markers.lock();
        let merged = ReadMarker::latest(markers.get(key).copied(), other)?;
        markers.insert(key.clone(), merged);
        Some(merged)
    }

    /// Advances the marker and writes it to the cache and the durable store.
    ///
    /// The cache write runs on the blocking pool. A cache failure is logged
    /// only.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Write` if the durable store rejected the mark.
    /// The local marker has already advanced in that case.
    pub async fn mark_read(
        &self,
        key: &ChannelKey,
        candidate: ReadMarker,
    ) -> Result<ReadMarker, DeliveryError> {
        self.advance_local(key, candidate);
        let marker = self.marker(key).unwrap_or(candidate);

        let cache = Arc::clone(&self.cache);
        let cache_key = key.clone();
        match tokio::task::spawn_blocking(move || cache.store(&cache_key, marker)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(channel = %key, error = %e, "Failed to cache read marker"),
            Err(e) => warn!(channel = %key, error = %e, "Read marker cache write did not finish"),
        }

        self.store.mark_read(key).await.map_err(|e| {
            warn!(channel = %key, error = %e, "Durable read mark failed, keeping local marker");
            DeliveryError::write("mark read", e)
        })?;

        debug!(channel = %key, marker = %marker.to_rfc3339(), "Channel marked read");
        Ok(marker)
    }

    /// Unread messages of one channel for the viewer.
    #[must_use]
    pub fn channel_unread(&self, key: &ChannelKey, messages: &[Message]) -> usize {
        UnreadCounter::count(messages, self.marker(key), &self.viewer, Utc::now())
    }

    /// Unread messages across the given channels of one community.
    #[must_use]
    pub fn community_unread<'a>(
        &self,
        community: &CommunityId,
        channels: impl IntoIterator<Item = (&'a ChannelId, &'a [Message])>,
    ) -> usize {
        let channels = channels.into_iter().map(|(channel, messages)| {
            let key = ChannelKey::new(community.clone(), channel.clone());
            (messages, self.marker(&key))
        });
        UnreadCounter::community_total(channels, &self.viewer, Utc::now())
    }
}
