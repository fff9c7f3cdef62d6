#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingEstablished,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    Failed,
    ShuttingDown,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingEstablished | Self::Connected
        )
    }

    /// Whether a connection was lost and events may currently be missed.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Reconnecting { .. } | Self::Failed)
    }

    #[must_use]
    pub const fn reconnect_attempt(&self) -> Option<u32> {
        if let Self::Reconnecting { attempt } = self {
            Some(*attempt)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingEstablished => write!(f, "Awaiting handshake"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {attempt})"),
            Self::Failed => write!(f, "Failed"),
            Self::ShuttingDown => write!(f, "Shutting Down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Reconnecting { attempt: 3 }.to_string(),
            "Reconnecting (attempt 3)"
        );
    }

    #[test]
    fn test_connection_state_checks() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(ConnectionState::AwaitingEstablished.is_active());
        assert!(!ConnectionState::Failed.is_active());
        assert!(ConnectionState::Reconnecting { attempt: 1 }.is_degraded());
        assert!(!ConnectionState::Connecting.is_degraded());
        assert_eq!(
            ConnectionState::Reconnecting { attempt: 2 }.reconnect_attempt(),
            Some(2)
        );
    }
}
