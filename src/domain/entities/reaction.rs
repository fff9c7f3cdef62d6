//! Reaction summaries and the authoritative reactor set.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Count of one emoji on a message, from one viewer's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCount {
    /// Emoji key.
    pub emoji: String,
    /// Number of distinct reactors.
    pub count: u32,
    /// Whether the viewer is one of the reactors.
    #[serde(rename = "userReacted")]
    pub reacted: bool,
}

/// Emoji counts for one message, in first-reaction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionSummary(Vec<ReactionCount>);

impl ReactionSummary {
    /// Creates a summary from counts.
    #[must_use]
    pub const fn new(counts: Vec<ReactionCount>) -> Self {
        Self(counts)
    }

    /// Creates an empty summary.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Looks up one emoji.
    #[must_use]
    pub fn get(&self, emoji: &str) -> Option<&ReactionCount> {
        self.0.iter().find(|r| r.emoji == emoji)
    }

    /// Count for an emoji, zero when absent.
    #[must_use]
    pub fn count(&self, emoji: &str) -> u32 {
        self.get(emoji).map_or(0, |r| r.count)
    }

    /// Whether the viewer reacted with an emoji.
    #[must_use]
    pub fn reacted(&self, emoji: &str) -> bool {
        self.get(emoji).is_some_and(|r| r.reacted)
    }

    /// Iterates counts.
    pub fn iter(&self) -> impl Iterator<Item = &ReactionCount> {
        self.0.iter()
    }

    /// Returns true when no emoji has a reactor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct emoji.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Result of a toggle on a [`ReactionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The actor's reaction was added.
    Added,
    /// The actor's reaction was removed.
    Removed,
}

/// Authoritative emoji to reactor mapping for one message.
///
/// An actor contributes at most once per emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionSet {
    entries: Vec<(String, Vec<UserId>)>,
}

impl ReactionSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Removes the actor's reaction if present, adds it otherwise.
    pub fn toggle(&mut self, actor: &UserId, emoji: &str) -> ToggleOutcome {
        let position = self.entries.iter().position(|(e, _)| e == emoji);

        let Some(index) = position else {
            self.entries.push((emoji.to_string(), vec![actor.clone()]));
            return ToggleOutcome::Added;
        };

        let reactors = &mut self.entries[index].1;
        if let Some(at) = reactors.iter().position(|r| r == actor) {
            reactors.remove(at);
            if reactors.is_empty() {
                self.entries.remove(index);
            }
            ToggleOutcome::Removed
        } else {
            reactors.push(actor.clone());
            ToggleOutcome::Added
        }
    }

    /// Whether the actor reacted with the emoji.
    #[must_use]
    pub fn contains(&self, actor: &UserId, emoji: &str) -> bool {
        self.entries
            .iter()
            .any(|(e, reactors)| e == emoji && reactors.contains(actor))
    }

    /// Summary as seen by `viewer`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn summary_for(&self, viewer: &UserId) -> ReactionSummary {
        ReactionSummary::new(
            self.entries
                .iter()
                .map(|(emoji, reactors)| ReactionCount {
                    emoji: emoji.clone(),
                    count: reactors.len() as u32,
                    reacted: reactors.contains(viewer),
                })
                .collect(),
        )
    }

    /// Returns true when nobody reacted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
