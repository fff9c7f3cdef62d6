//! Read marker entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point up to which a viewer has seen a channel.
///
/// Markers only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadMarker(DateTime<Utc>);

impl ReadMarker {
    /// Creates a marker at the given instant.
    #[must_use]
    pub const fn at(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }

    /// Creates a marker at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Marker timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Moves the marker forward to `candidate`. Returns true if it moved.
    pub fn advance(&mut self, candidate: Self) -> bool {
        if candidate.0 > self.0 {
            self.0 = candidate.0;
            true
        } else {
            false
        }
    }

    /// Last-writer-wins merge of two optional markers.
    #[must_use]
    pub fn latest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Whether a message created at `created_at` is past this marker.
    #[must_use]
    pub fn is_unread(&self, created_at: DateTime<Utc>) -> bool {
        created_at > self.0
    }

    /// RFC 3339 form used by the local cache.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Parses the RFC 3339 form.
    #[must_use]
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|t| Self(t.with_timezone(&Utc)))
    }
}
