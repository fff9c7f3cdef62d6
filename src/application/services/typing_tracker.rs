//! Local typing debounce and remote typing presence.

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::entities::UserId;
use crate::domain::ports::TypingAction;

/// Default inactivity window before a typing session ends.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalTypingState {
    #[default]
    Idle,
    Typing {
        deadline: Instant,
    },
}

/// Debounces the local actor's keystrokes into start/stop signals.
///
/// One `Start` per typing session; the session ends after the idle timeout
/// without a keystroke, or when the message is sent.
#[derive(Debug, Clone)]
pub struct LocalTyping {
    state: LocalTypingState,
    idle_timeout: Duration,
}

impl LocalTyping {
    #[must_use]
    pub const fn new(idle_timeout: Duration) -> Self {
        Self {
            state: LocalTypingState::Idle,
            idle_timeout,
        }
    }

    /// Records a keystroke. Returns `Start` only when leaving `Idle`.
    pub fn on_keystroke(&mut self, now: Instant) -> Option<TypingAction> {
        let deadline = now + self.idle_timeout;
        let was_idle = matches!(self.state, LocalTypingState::Idle);
        self.state = LocalTypingState::Typing { deadline };
        was_idle.then_some(TypingAction::Start)
    }

    /// Ends the session if its deadline has passed.
    pub fn on_deadline(&mut self, now: Instant) -> Option<TypingAction> {
        match self.state {
            LocalTypingState::Typing { deadline } if now >= deadline => {
                self.state = LocalTypingState::Idle;
                Some(TypingAction::Stop)
            }
            _ => None,
        }
    }

    /// Ends the session because the message was sent or the view closed.
    pub fn finish(&mut self) -> Option<TypingAction> {
        match self.state {
            LocalTypingState::Typing { .. } => {
                self.state = LocalTypingState::Idle;
                Some(TypingAction::Stop)
            }
            LocalTypingState::Idle => None,
        }
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            LocalTypingState::Typing { deadline } => Some(deadline),
            LocalTypingState::Idle => None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LocalTypingState {
        self.state
    }

    #[must_use]
    pub const fn is_typing(&self) -> bool {
        matches!(self.state, LocalTypingState::Typing { .. })
    }
}

impl Default for LocalTyping {
    fn default() -> Self {
        Self::new(TYPING_IDLE_TIMEOUT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingUser {
    pub user_id: UserId,
    pub user_name: String,
    pub expires_at: Instant,
}

/// Other members currently typing in the open channel.
#[derive(Debug, Clone)]
pub struct RemoteTypingSet {
    viewer: UserId,
    users: Vec<TypingUser>,
    ttl: Duration,
}

impl RemoteTypingSet {
    #[must_use]
    pub const fn new(viewer: UserId, ttl: Duration) -> Self {
        Self {
            viewer,
            users: Vec::new(),
            ttl,
        }
    }

    /// Adds or refreshes a typing member. The viewer's own signal is ignored.
    ///
    /// Returns true when the visible set changed.
    pub fn start(&mut self, user_id: UserId, user_name: String, now: Instant) -> bool {
        if user_id == self.viewer {
            return false;
        }

        let expires_at = now + self.ttl;
        if let Some(existing) = self.users.iter_mut().find(|u| u.user_id == user_id) {
            existing.expires_at = expires_at;
            existing.user_name = user_name;
            false
        } else {
            self.users.push(TypingUser {
                user_id,
                user_name,
                expires_at,
            });
            true
        }
    }

    pub fn stop(&mut self, user_id: &UserId) -> bool {
        let before = self.users.len();
        self.users.retain(|u| &u.user_id != user_id);
        self.users.len() != before
    }

    /// Drops expired members. Returns true when any were removed.
    pub fn sweep(&mut self, now: Instant) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.expires_at > now);
        self.users.len() != before
    }

    #[must_use]
    pub fn next_expiry(&self) -> Option<Instant> {
        self.users.iter().map(|u| u.expires_at).min()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    #[must_use]
    pub fn users(&self) -> &[TypingUser] {
        &self.users
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.users.iter().map(|u| u.user_name.clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }
}

/// Human-readable typing line for a set of names.
#[must_use]
pub fn format_typing_indicator(names: &[String]) -> Option<String> {
    match names {
        [] => None,
        [one] => Some(format!("{one} is typing...")),
        [a, b] => Some(format!("{a} and {b} are typing...")),
        [a, b, c] => Some(format!("{a}, {b} and {c} are typing...")),
        _ => Some("Several people are typing...".to_string()),
    }
}
