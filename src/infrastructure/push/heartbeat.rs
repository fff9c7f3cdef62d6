//! Client-side keepalive for the push socket.
//!
//! After `activity_timeout` without any inbound frame the client sends a ping
//! and expects some frame back within `pong_timeout`, otherwise the connection
//! is considered dead.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    Wait,
    SendPing,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct KeepAlive {
    activity_timeout: Duration,
    pong_timeout: Duration,
    last_activity: Instant,
    ping_sent_at: Option<Instant>,
}

impl KeepAlive {
    #[must_use]
    pub const fn new(activity_timeout: Duration, pong_timeout: Duration, now: Instant) -> Self {
        Self {
            activity_timeout,
            pong_timeout,
            last_activity: now,
            ping_sent_at: None,
        }
    }

    pub const fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.ping_sent_at = None;
    }

    #[must_use]
    pub fn next_deadline(&self) -> Instant {
        match self.ping_sent_at {
            Some(sent) => sent + self.pong_timeout,
            None => self.last_activity + self.activity_timeout,
        }
    }

    pub fn poll(&mut self, now: Instant) -> KeepAliveAction {
        if now < self.next_deadline() {
            return KeepAliveAction::Wait;
        }

        if self.ping_sent_at.is_some() {
            KeepAliveAction::TimedOut
        } else {
            self.ping_sent_at = Some(now);
            KeepAliveAction::SendPing
        }
    }

    #[must_use]
    pub const fn awaiting_pong(&self) -> bool {
        self.ping_sent_at.is_some()
    }
}
