/// How the active channel is currently being fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportStatus {
    /// No channel open.
    #[default]
    Idle,
    /// Channel opened, subscription not yet confirmed.
    Connecting,
    /// Push subscription live, polling as a safety net.
    Live,
    /// Push unavailable, polling only.
    PollOnly,
}

impl TransportStatus {
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }

    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::PollOnly)
    }
}

impl std::fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Live => write!(f, "Live"),
            Self::PollOnly => write!(f, "Poll only"),
        }
    }
}
