//! Pusher-style JSON frames.
//!
//! Every frame is `{ "event", "channel"?, "data"? }`. Servers frequently send
//! `data` as a JSON document encoded into a string, so it is unwrapped before
//! decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::constants::events;
use super::error::{PushError, PushResult};
use crate::domain::entities::{ChannelId, MessageId, UserId};
use crate::domain::ports::PushEvent;
use crate::infrastructure::api::dto::{MessageDto, MessageUpdatesDto};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl PushFrame {
    #[must_use]
    pub fn new(event: impl Into<String>, channel: Option<String>, data: Option<Value>) -> Self {
        Self {
            event: event.into(),
            channel,
            data,
        }
    }

    #[must_use]
    pub fn subscribe(topic: &str) -> Self {
        Self::new(events::SUBSCRIBE, None, Some(json!({ "channel": topic })))
    }

    #[must_use]
    pub fn unsubscribe(topic: &str) -> Self {
        Self::new(events::UNSUBSCRIBE, None, Some(json!({ "channel": topic })))
    }

    #[must_use]
    pub fn ping() -> Self {
        Self::new(events::PING, None, Some(json!({})))
    }

    #[must_use]
    pub fn pong() -> Self {
        Self::new(events::PONG, None, Some(json!({})))
    }

    /// # Errors
    /// Returns error if the text is not a frame.
    pub fn parse(text: &str) -> PushResult<Self> {
        serde_json::from_str(text).map_err(|e| PushError::serialization(e.to_string()))
    }

    /// # Errors
    /// Returns error if serialization fails.
    pub fn encode(&self) -> PushResult<String> {
        serde_json::to_string(self).map_err(|e| PushError::serialization(e.to_string()))
    }

    /// Decodes `data`, unwrapping a string-encoded payload.
    ///
    /// # Errors
    /// Returns error if the payload does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> PushResult<T> {
        let value = match &self.data {
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map_err(|e| PushError::serialization(format!("{}: {e}", self.event)))?,
            Some(value) => value.clone(),
            None => Value::Null,
        };

        serde_json::from_value(value)
            .map_err(|e| PushError::serialization(format!("{}: {e}", self.event)))
    }
}

/// Frame classified by its meaning to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    ConnectionEstablished {
        socket_id: String,
        activity_timeout: Option<u64>,
    },
    SubscriptionSucceeded {
        topic: String,
    },
    SubscriptionFailed {
        topic: String,
        message: String,
    },
    Ping,
    Pong,
    Error {
        code: Option<u16>,
        message: String,
    },
    ChannelEvent {
        topic: String,
        frame: PushFrame,
    },
    Ignored {
        event: String,
    },
}

#[derive(Debug, Deserialize)]
struct EstablishedPayload {
    socket_id: String,
    #[serde(default)]
    activity_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewMessagePayload {
    message: MessageDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageUpdatedPayload {
    message_id: MessageId,
    #[serde(default)]
    updates: MessageUpdatesDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDeletedPayload {
    message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserTypingPayload {
    user_id: UserId,
    #[serde(default)]
    user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStoppedTypingPayload {
    user_id: UserId,
}

pub struct PushCodec;

impl PushCodec {
    /// # Errors
    /// Returns error if a protocol frame carries a malformed payload.
    pub fn classify(frame: PushFrame) -> PushResult<ServerMessage> {
        let name = frame.event.clone();
        let message = match name.as_str() {
            events::CONNECTION_ESTABLISHED => {
                let payload: EstablishedPayload = frame.payload()?;
                ServerMessage::ConnectionEstablished {
                    socket_id: payload.socket_id,
                    activity_timeout: payload.activity_timeout,
                }
            }
            events::SUBSCRIPTION_SUCCEEDED => ServerMessage::SubscriptionSucceeded {
                topic: frame.channel.unwrap_or_default(),
            },
            events::SUBSCRIPTION_ERROR => ServerMessage::SubscriptionFailed {
                message: frame
                    .data
                    .as_ref()
                    .map_or_else(String::new, ToString::to_string),
                topic: frame.channel.unwrap_or_default(),
            },
            events::PING => ServerMessage::Ping,
            events::PONG => ServerMessage::Pong,
            events::ERROR => {
                let payload: ErrorPayload = frame.payload().unwrap_or(ErrorPayload {
                    code: None,
                    message: None,
                });
                ServerMessage::Error {
                    code: payload.code,
                    message: payload.message.unwrap_or_default(),
                }
            }
            other if other.starts_with("pusher") => ServerMessage::Ignored {
                event: other.to_string(),
            },
            _ => match frame.channel.clone() {
                Some(topic) => ServerMessage::ChannelEvent { topic, frame },
                None => ServerMessage::Ignored { event: frame.event },
            },
        };

        Ok(message)
    }

    /// Decodes an application event for a channel.
    ///
    /// Returns `Ok(None)` for event names the client does not handle.
    ///
    /// # Errors
    /// Returns error if a known event carries a malformed payload.
    pub fn decode_event(frame: &PushFrame, channel: &ChannelId) -> PushResult<Option<PushEvent>> {
        let event = match frame.event.as_str() {
            events::NEW_MESSAGE => {
                let payload: NewMessagePayload = frame.payload()?;
                PushEvent::NewMessage {
                    message: payload.message.into_message(channel),
                }
            }
            events::MESSAGE_UPDATED => {
                let payload: MessageUpdatedPayload = frame.payload()?;
                PushEvent::MessageUpdated {
                    message_id: payload.message_id,
                    patch: payload.updates.into(),
                }
            }
            events::MESSAGE_DELETED => {
                let payload: MessageDeletedPayload = frame.payload()?;
                PushEvent::MessageDeleted {
                    message_id: payload.message_id,
                }
            }
            events::USER_TYPING => {
                let payload: UserTypingPayload = frame.payload()?;
                PushEvent::UserTyping {
                    user_name: payload
                        .user_name
                        .unwrap_or_else(|| payload.user_id.to_string()),
                    user_id: payload.user_id,
                }
            }
            events::USER_STOPPED_TYPING => {
                let payload: UserStoppedTypingPayload = frame.payload()?;
                PushEvent::UserStoppedTyping {
                    user_id: payload.user_id,
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::MessagePatch;

    #[test]
    fn test_outgoing_frames() {
        assert_eq!(
            PushFrame::subscribe("channel-ch1").encode().unwrap(),
            r#"{"event":"pusher:subscribe","data":{"channel":"channel-ch1"}}"#
        );
        assert_eq!(
            PushFrame::ping().encode().unwrap(),
            r#"{"event":"pusher:ping","data":{}}"#
        );
    }

    #[test]
    fn test_connection_established_with_string_data() {
        let frame = PushFrame::parse(
            r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"123.456\",\"activity_timeout\":30}"}"#,
        )
        .unwrap();

        assert_eq!(
            PushCodec::classify(frame).unwrap(),
            ServerMessage::ConnectionEstablished {
                socket_id: "123.456".into(),
                activity_timeout: Some(30),
            }
        );
    }

    #[test]
    fn test_error_frame() {
        let frame =
            PushFrame::parse(r#"{"event":"pusher:error","data":{"code":4201,"message":"Pong reply not received"}}"#)
                .unwrap();
        assert_eq!(
            PushCodec::classify(frame).unwrap(),
            ServerMessage::Error {
                code: Some(4201),
                message: "Pong reply not received".into()
            }
        );
    }

    #[test]
    fn test_subscription_succeeded() {
        let frame = PushFrame::parse(
            r#"{"event":"pusher_internal:subscription_succeeded","channel":"channel-ch1","data":"{}"}"#,
        )
        .unwrap();
        assert_eq!(
            PushCodec::classify(frame).unwrap(),
            ServerMessage::SubscriptionSucceeded {
                topic: "channel-ch1".into()
            }
        );
    }

    #[test]
    fn test_new_message_event() {
        let text = r#"{"event":"new-message","channel":"channel-ch1","data":"{\"message\":{\"id\":\"m1\",\"content\":\"hi\",\"type\":\"text\",\"author\":{\"id\":\"u1\",\"name\":\"Ada\"},\"replyTo\":null,\"isEdited\":false,\"isDeleted\":false,\"createdAt\":\"2024-05-01T10:00:00Z\",\"reactions\":[]}}"}"#;
        let frame = PushFrame::parse(text).unwrap();

        let ServerMessage::ChannelEvent { topic, frame } = PushCodec::classify(frame).unwrap()
        else {
            panic!("expected channel event");
        };
        assert_eq!(topic, "channel-ch1");

        let event = PushCodec::decode_event(&frame, &ChannelId::new("ch1"))
            .unwrap()
            .unwrap();
        let PushEvent::NewMessage { message } = event else {
            panic!("expected new message");
        };
        assert_eq!(message.id().as_str(), "m1");
        assert_eq!(message.channel_id().as_str(), "ch1");
    }

    #[test]
    fn test_update_delete_and_typing_events() {
        let channel = ChannelId::new("ch1");

        let update = PushFrame::new(
            "message-updated",
            Some("channel-ch1".into()),
            Some(json!({ "messageId": "m1", "updates": { "content": "fixed", "isEdited": true } })),
        );
        assert_eq!(
            PushCodec::decode_event(&update, &channel).unwrap(),
            Some(PushEvent::MessageUpdated {
                message_id: "m1".into(),
                patch: MessagePatch::edit("fixed"),
            })
        );

        let delete = PushFrame::new(
            "message-deleted",
            Some("channel-ch1".into()),
            Some(json!({ "messageId": "m1" })),
        );
        assert_eq!(
            PushCodec::decode_event(&delete, &channel).unwrap(),
            Some(PushEvent::MessageDeleted {
                message_id: "m1".into()
            })
        );

        let typing = PushFrame::new(
            "user-typing",
            Some("channel-ch1".into()),
            Some(json!({ "userId": "u2", "userName": "Bob", "userImage": null })),
        );
        assert_eq!(
            PushCodec::decode_event(&typing, &channel).unwrap(),
            Some(PushEvent::UserTyping {
                user_id: "u2".into(),
                user_name: "Bob".into(),
            })
        );
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        let frame = PushFrame::new("poll-created", Some("channel-ch1".into()), None);
        assert_eq!(
            PushCodec::decode_event(&frame, &ChannelId::new("ch1")).unwrap(),
            None
        );
    }

    #[test]
    fn test_malformed_payload_is_error() {
        let frame = PushFrame::new(
            "message-deleted",
            Some("channel-ch1".into()),
            Some(json!({ "id": 5 })),
        );
        assert!(PushCodec::decode_event(&frame, &ChannelId::new("ch1")).is_err());
    }
}
