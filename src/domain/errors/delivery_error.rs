//! Errors surfaced by the delivery coordinator.

use thiserror::Error;

use super::ApiError;

/// Delivery error variants.
///
/// Transport failures are absorbed by the coordinator and retried; write
/// failures are handed back to whoever started the action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DeliveryError {
    #[error("{operation} failed in transport: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("{operation} was not persisted: {source}")]
    Write {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("push transport unavailable: {message}")]
    PushUnavailable { message: String },

    #[error("no channel is open")]
    NoActiveChannel,

    #[error("delivery coordinator has stopped")]
    CoordinatorClosed,
}

impl DeliveryError {
    /// Creates transport failure.
    #[must_use]
    pub const fn transport(operation: &'static str, source: ApiError) -> Self {
        Self::Transport { operation, source }
    }

    /// Creates write failure.
    #[must_use]
    pub const fn write(operation: &'static str, source: ApiError) -> Self {
        Self::Write { operation, source }
    }

    /// Creates push unavailable error.
    #[must_use]
    pub fn push_unavailable(message: impl Into<String>) -> Self {
        Self::PushUnavailable {
            message: message.into(),
        }
    }

    /// Returns whether this failure only affects freshness of delivery.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::PushUnavailable { .. })
    }

    /// Returns whether a user action failed to persist.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// Underlying store error, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Transport { source, .. } | Self::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}
