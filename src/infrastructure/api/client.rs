//! HTTP client for the message store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::dto::{
    ErrorResponse, MessageEnvelope, MessagesEnvelope, ReactionBody, SendMessageBody, TypingBody,
};
use crate::domain::entities::{AuthToken, ChannelKey, Message, MessageId};
use crate::domain::errors::ApiError;
use crate::domain::ports::{ChatDataPort, SendMessageRequest, TypingAction};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRY_AFTER_MS: u64 = 5000;
const USER_AGENT: &str = concat!("huddle/", env!("CARGO_PKG_VERSION"));

/// Message store client speaking JSON over HTTP.
pub struct HttpChatClient {
    client: Client,
    base_url: Url,
    token: Option<AuthToken>,
}

impl HttpChatClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns error if `base_url` is not a URL that can carry a path or if
    /// HTTP client creation fails.
    pub fn new(base_url: impl Into<String>, token: Option<AuthToken>) -> Result<Self, ApiError> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| ApiError::unexpected(format!("invalid API base URL {raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::unexpected(format!(
                "API base URL {raw} cannot carry a path"
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::unexpected(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Route under a channel. Every id becomes one percent-encoded segment.
    fn channel_url(&self, channel: &ChannelKey, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([
                    "communities",
                    channel.community.as_str(),
                    "channels",
                    channel.channel.as_str(),
                ])
                .extend(tail);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::CACHE_CONTROL, "no-cache");
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, token.bearer()),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(status, response).await)
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse store response");
            ApiError::decode(e.to_string())
        })
    }
}

#[async_trait]
impl ChatDataPort for HttpChatClient {
    async fn list_messages(
        &self,
        channel: &ChannelKey,
        after: Option<&MessageId>,
    ) -> Result<Vec<Message>, ApiError> {
        let url = self.channel_url(channel, &["messages"]);
        let mut request = self.client.get(url);
        if let Some(after) = after {
            request = request.query(&[("after", after.as_str())]);
        }

        let response = self.execute(request).await?;
        let envelope: MessagesEnvelope = Self::decode(response).await?;

        debug!(
            channel = %channel,
            after = after.map(MessageId::as_str),
            count = envelope.messages.len(),
            "Listed messages"
        );

        Ok(envelope
            .messages
            .into_iter()
            .map(|dto| dto.into_message(&channel.channel))
            .collect())
    }

    async fn list_messages_since(
        &self,
        channel: &ChannelKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, ApiError> {
        let url = self.channel_url(channel, &["messages"]);
        let cursor = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        let request = self.client.get(url).query(&[("after", cursor.as_str())]);

        let response = self.execute(request).await?;
        let envelope: MessagesEnvelope = Self::decode(response).await?;

        debug!(
            channel = %channel,
            since = %cursor,
            count = envelope.messages.len(),
            "Listed messages since timestamp"
        );

        Ok(envelope
            .messages
            .into_iter()
            .map(|dto| dto.into_message(&channel.channel))
            .collect())
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ApiError> {
        let url = self.channel_url(&request.channel, &["messages"]);
        let body = SendMessageBody {
            content: &request.content,
            reply_to_id: request.reply_to.as_ref(),
        };

        let response = self.execute(self.client.post(url).json(&body)).await?;
        let envelope: MessageEnvelope = Self::decode(response).await?;
        let message = envelope.message.into_message(&request.channel.channel);

        debug!(channel = %request.channel, message_id = %message.id(), "Message stored");
        Ok(message)
    }

    async fn toggle_reaction(
        &self,
        channel: &ChannelKey,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let url = self.channel_url(channel, &["messages", message_id.as_str(), "reactions"]);
        self.execute(self.client.post(url).json(&ReactionBody { emoji }))
            .await?;
        Ok(())
    }

    async fn send_typing(
        &self,
        channel: &ChannelKey,
        action: TypingAction,
    ) -> Result<(), ApiError> {
        let url = self.channel_url(channel, &["typing"]);
        let body = TypingBody {
            action: action.as_str(),
        };
        self.execute(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn mark_read(&self, channel: &ChannelKey) -> Result<(), ApiError> {
        let url = self.channel_url(channel, &["read"]);
        self.execute(self.client.post(url)).await?;
        Ok(())
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    warn!(error = %e, "Failed to reach message store");
    if e.is_timeout() {
        ApiError::network("request timed out")
    } else if e.is_connect() {
        ApiError::network("failed to connect to message store")
    } else {
        ApiError::network(e.to_string())
    }
}

async fn error_from_response(status: StatusCode, response: Response) -> ApiError {
    let retry_after_ms = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000));

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => format!("HTTP {status}"),
    };

    map_status(status, message, retry_after_ms)
}

fn map_status(status: StatusCode, message: String, retry_after_ms: Option<u64>) -> ApiError {
    match status {
        StatusCode::BAD_REQUEST => ApiError::validation(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::rejected(status.as_u16(), message)
        }
        StatusCode::NOT_FOUND => ApiError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            retry_after_ms: retry_after_ms.unwrap_or(DEFAULT_RETRY_AFTER_MS),
        },
        s if s.is_server_error() => ApiError::server(s.as_u16(), message),
        s => ApiError::unexpected(format!("unexpected response: {s} - {message}")),
    }
}
