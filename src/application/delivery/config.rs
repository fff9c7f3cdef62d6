use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_secs(2);
pub const DEFAULT_REMOTE_TYPING_TTL: Duration = Duration::from_secs(2);
pub const DEFAULT_READ_DWELL: Duration = Duration::from_millis(1000);

/// Timing knobs of a channel view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub poll_interval: Duration,
    pub typing_idle: Duration,
    pub remote_typing_ttl: Duration,
    pub read_dwell: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            typing_idle: DEFAULT_TYPING_IDLE,
            remote_typing_ttl: DEFAULT_REMOTE_TYPING_TTL,
            read_dwell: DEFAULT_READ_DWELL,
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_typing_idle(mut self, timeout: Duration) -> Self {
        self.typing_idle = timeout;
        self
    }

    #[must_use]
    pub const fn with_remote_typing_ttl(mut self, ttl: Duration) -> Self {
        self.remote_typing_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_read_dwell(mut self, dwell: Duration) -> Self {
        self.read_dwell = dwell;
        self
    }
}
