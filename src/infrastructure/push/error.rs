use std::io;
use thiserror::Error;

pub type PushResult<T> = Result<T, PushError>;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("server error {code:?}: {message}")]
    Server { code: Option<u16>, message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("no pong received within the keepalive window")]
    PongTimeout,

    #[error("not connected to push server")]
    NotConnected,

    #[error("push client shutting down")]
    ShuttingDown,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PushError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Error code carried by a server error or a close frame.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Server { code, .. } => *code,
            Self::ConnectionClosed { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        if let Some(code) = self.code()
            && let Some(class) = PushErrorCode::classify(code)
        {
            return class.should_reconnect();
        }

        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionClosed { .. }
                | Self::WebSocket { .. }
                | Self::Server { .. }
                | Self::Timeout { .. }
                | Self::PongTimeout
                | Self::Io(_)
        )
    }

    /// Whether the server asked for a reconnect without backoff.
    #[must_use]
    pub const fn reconnect_immediately(&self) -> bool {
        matches!(
            self.code(),
            Some(code) if matches!(PushErrorCode::classify(code), Some(PushErrorCode::ReconnectImmediately))
        )
    }
}

/// Classes of `pusher:error` and close codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushErrorCode {
    /// 4000-4099: do not reconnect with the same parameters.
    Fatal,
    /// 4100-4199: reconnect after backing off.
    ReconnectWithBackoff,
    /// 4200-4299: reconnect right away.
    ReconnectImmediately,
}

impl PushErrorCode {
    #[must_use]
    pub const fn classify(code: u16) -> Option<Self> {
        match code {
            4000..=4099 => Some(Self::Fatal),
            4100..=4199 => Some(Self::ReconnectWithBackoff),
            4200..=4299 => Some(Self::ReconnectImmediately),
            _ => None,
        }
    }

    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(self, Self::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(4001, Some(PushErrorCode::Fatal) ; "fatal")]
    #[test_case(4100, Some(PushErrorCode::ReconnectWithBackoff) ; "backoff")]
    #[test_case(4201, Some(PushErrorCode::ReconnectImmediately) ; "immediate")]
    #[test_case(1006, None ; "websocket close")]
    fn test_code_classification(code: u16, expected: Option<PushErrorCode>) {
        assert_eq!(PushErrorCode::classify(code), expected);
    }

    #[test]
    fn test_reconnect_policy() {
        assert!(PushError::connection_failed("refused").should_reconnect());
        assert!(PushError::PongTimeout.should_reconnect());
        assert!(
            PushError::ConnectionClosed {
                code: 1006,
                reason: "abnormal".into()
            }
            .should_reconnect()
        );
        assert!(
            !PushError::Server {
                code: Some(4004),
                message: "app disabled".into()
            }
            .should_reconnect()
        );
        assert!(!PushError::protocol("bad frame").should_reconnect());
        assert!(!PushError::ShuttingDown.should_reconnect());
    }

    #[test]
    fn test_immediate_reconnect() {
        let err = PushError::ConnectionClosed {
            code: 4200,
            reason: "restart".into(),
        };
        assert!(err.should_reconnect());
        assert!(err.reconnect_immediately());
        assert!(
            !PushError::Server {
                code: Some(4100),
                message: "over capacity".into()
            }
            .reconnect_immediately()
        );
    }
}
