use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::{Message, ReadMarker, UserId};

/// How far back a channel with no read marker counts as unread.
pub const UNMARKED_LOOKBACK: Duration = Duration::hours(24);

pub struct UnreadCounter;

impl UnreadCounter {
    /// Instant after which messages count as unread.
    #[must_use]
    pub fn cutoff(marker: Option<ReadMarker>, now: DateTime<Utc>) -> DateTime<Utc> {
        marker.map_or(now - UNMARKED_LOOKBACK, |m| m.timestamp())
    }

    /// Whether a single message counts as unread for `viewer`.
    #[must_use]
    pub fn is_unread(message: &Message, cutoff: DateTime<Utc>, viewer: &UserId) -> bool {
        !message.is_deleted() && !message.is_authored_by(viewer) && message.created_at() > cutoff
    }

    /// Unread messages in one channel.
    #[must_use]
    pub fn count<'a>(
        messages: impl IntoIterator<Item = &'a Message>,
        marker: Option<ReadMarker>,
        viewer: &UserId,
        now: DateTime<Utc>,
    ) -> usize {
        let cutoff = Self::cutoff(marker, now);
        messages
            .into_iter()
            .filter(|m| Self::is_unread(m, cutoff, viewer))
            .count()
    }

    /// Unread messages across several channels of a community.
    #[must_use]
    pub fn community_total<'a, I>(channels: I, viewer: &UserId, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = (&'a [Message], Option<ReadMarker>)>,
    {
        channels
            .into_iter()
            .map(|(messages, marker)| Self::count(messages, marker, viewer, now))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::entities::MessageAuthor;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(id: &str, author: &str, secs: i64) -> Message {
        Message::new(
            id.into(),
            "ch".into(),
            MessageAuthor::new(author, author),
            "body",
            at(secs),
        )
    }

    #[test]
    fn test_counts_only_newer_foreign_messages() {
        let me = UserId::new("me");
        let messages = vec![
            msg("1", "bob", 10),
            msg("2", "bob", 20),
            msg("3", "me", 30),
            msg("4", "carol", 40),
        ];
        let marker = Some(ReadMarker::at(at(15)));

        assert_eq!(UnreadCounter::count(&messages, marker, &me, at(100)), 2);
    }

    #[test]
    fn test_deleted_messages_are_ignored() {
        let me = UserId::new("me");
        let messages = vec![msg("1", "bob", 10).with_flags(false, true), msg("2", "bob", 20)];

        assert_eq!(UnreadCounter::count(&messages, None, &me, at(100)), 1);
    }

    #[test]
    fn test_no_marker_uses_lookback_window() {
        let me = UserId::new("me");
        let now = at(0) + Duration::hours(30);
        let messages = vec![msg("old", "bob", 0), msg("recent", "bob", 29 * 3600)];

        assert_eq!(UnreadCounter::count(&messages, None, &me, now), 1);
    }

    #[test]
    fn test_marker_at_message_time_is_read() {
        let me = UserId::new("me");
        let messages = vec![msg("1", "bob", 10)];
        let marker = Some(ReadMarker::at(at(10)));

        assert_eq!(UnreadCounter::count(&messages, marker, &me, at(100)), 0);
    }

    #[test]
    fn test_community_total_sums_channels() {
        let me = UserId::new("me");
        let general = vec![msg("1", "bob", 10), msg("2", "bob", 20)];
        let random = vec![msg("3", "carol", 5)];

        let total = UnreadCounter::community_total(
            [
                (general.as_slice(), Some(ReadMarker::at(at(15)))),
                (random.as_slice(), Some(ReadMarker::at(at(0)))),
            ],
            &me,
            at(100),
        );
        assert_eq!(total, 2);
    }
}
