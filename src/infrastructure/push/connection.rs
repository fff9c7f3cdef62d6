use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::codec::PushFrame;
use super::constants::CONNECTION_TIMEOUT;
use super::error::{PushError, PushResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// A single socket to the push server.
#[async_trait]
pub trait PushConnection: Send + Sync {
    async fn connect(&mut self, url: &str) -> PushResult<()>;
    async fn disconnect(&mut self) -> PushResult<()>;
    async fn send(&mut self, frame: &PushFrame) -> PushResult<()>;
    /// Waits for the next JSON frame. Transport pings are answered internally.
    async fn receive(&mut self) -> PushResult<PushFrame>;
    fn is_connected(&self) -> bool;
}

/// Opens fresh connections; one per connection attempt.
pub type Connector = std::sync::Arc<dyn Fn() -> Box<dyn PushConnection> + Send + Sync>;

pub struct WebSocketConnection {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    connected: bool,
}

impl WebSocketConnection {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            connected: false,
        }
    }

    /// Connector producing WebSocket connections.
    #[must_use]
    pub fn connector() -> Connector {
        std::sync::Arc::new(|| Box::new(Self::new()))
    }
}

impl Default for WebSocketConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn connect(&mut self, url: &str) -> PushResult<()> {
        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| PushError::timeout("connection"))?
            .map_err(|e| PushError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;

        Ok(())
    }

    async fn disconnect(&mut self) -> PushResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        debug!("Push socket closed");
        Ok(())
    }

    async fn send(&mut self, frame: &PushFrame) -> PushResult<()> {
        let writer = self.writer.as_mut().ok_or(PushError::NotConnected)?;
        let json = frame.encode()?;

        trace!(event = %frame.event, "Sending push frame");
        writer
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| PushError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> PushResult<PushFrame> {
        let reader = self.reader.as_mut().ok_or(PushError::NotConnected)?;

        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return PushFrame::parse(&text);
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data);
                    return PushFrame::parse(&text);
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );

                    return Err(PushError::ConnectionClosed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(PushError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(PushError::ConnectionClosed {
                        code: 1000,
                        reason: "Stream ended".to_string(),
                    });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
