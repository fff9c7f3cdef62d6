use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, error, info, trace, warn};

use super::codec::{PushCodec, PushFrame, ServerMessage};
use super::connection::{Connector, PushConnection, WebSocketConnection};
use super::constants::{
    DEFAULT_ACTIVITY_TIMEOUT, DEFAULT_PUSH_URL, DEFAULT_TOPIC_PREFIX, ESTABLISH_TIMEOUT,
    MAX_RECONNECT_ATTEMPTS, PONG_TIMEOUT, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX,
    RECONNECT_JITTER_MAX,
};
use super::error::{PushError, PushErrorCode, PushResult};
use super::heartbeat::{KeepAlive, KeepAliveAction};
use super::state::ConnectionState;
use crate::domain::entities::ChannelKey;
use crate::domain::errors::DeliveryError;
use crate::domain::ports::{PushEvent, PushPort};

#[derive(Debug, Clone)]
pub struct PushClientConfig {
    pub url: String,
    pub topic_prefix: String,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
}

impl Default for PushClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PUSH_URL.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl PushClientConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

struct Subscriber {
    channel: ChannelKey,
    tx: mpsc::UnboundedSender<PushEvent>,
}

/// State shared between the client handle and its connection loop.
#[derive(Default)]
struct Shared {
    topics: Mutex<HashMap<String, Subscriber>>,
    state: Mutex<ConnectionState>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    fn topic_names(&self) -> Vec<String> {
        self.topics.lock().keys().cloned().collect()
    }

    fn send_to(&self, topic: &str, event: PushEvent) {
        let mut topics = self.topics.lock();
        if let Some(subscriber) = topics.get(topic)
            && subscriber.tx.send(event).is_err()
        {
            topics.remove(topic);
        }
    }

    fn broadcast(&self, event: &PushEvent) {
        self.topics
            .lock()
            .retain(|_, subscriber| subscriber.tx.send(event.clone()).is_ok());
    }

    fn dispatch(&self, topic: &str, frame: &PushFrame) {
        let channel = match self.topics.lock().get(topic) {
            Some(subscriber) => subscriber.channel.channel.clone(),
            None => {
                trace!(topic, event = %frame.event, "Event for unknown topic");
                return;
            }
        };

        match PushCodec::decode_event(frame, &channel) {
            Ok(Some(event)) => {
                debug!(topic, event = %frame.event, "Dispatching push event");
                self.send_to(topic, event);
            }
            Ok(None) => trace!(topic, event = %frame.event, "Unhandled push event"),
            Err(e) => warn!(topic, error = %e, "Failed to decode push event"),
        }
    }
}

#[derive(Debug)]
enum LoopCommand {
    Subscribe(String),
    Unsubscribe(String),
}

/// Push adapter multiplexing every channel topic over one socket.
///
/// The connection is opened lazily on the first subscription and kept alive
/// with reconnects until the client is dropped or a fatal error occurs.
pub struct PushClient {
    config: Arc<PushClientConfig>,
    connector: Connector,
    shared: Arc<Shared>,
    command_tx: Mutex<Option<mpsc::UnboundedSender<LoopCommand>>>,
}

impl PushClient {
    #[must_use]
    pub fn new(config: PushClientConfig) -> Self {
        Self::with_connector(config, WebSocketConnection::connector())
    }

    #[must_use]
    pub fn with_connector(config: PushClientConfig, connector: Connector) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            shared: Arc::new(Shared::default()),
            command_tx: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn topic_for(&self, channel: &ChannelKey) -> String {
        format!("{}{}", self.config.topic_prefix, channel.channel)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.command_tx
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Closes the socket. The next subscription reconnects.
    pub fn disconnect(&self) {
        self.command_tx.lock().take();
    }

    fn ensure_running(&self) -> mpsc::UnboundedSender<LoopCommand> {
        let mut guard = self.command_tx.lock();
        if let Some(tx) = guard.as_ref()
            && !tx.is_closed()
        {
            return tx.clone();
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *guard = Some(command_tx.clone());

        let config = self.config.clone();
        let connector = self.connector.clone();
        let shared = self.shared.clone();

        tokio::spawn(async move {
            let result = std::panic::AssertUnwindSafe(run_push_loop(
                config,
                connector,
                shared.clone(),
                command_rx,
            ));

            if let Err(panic_info) = result.catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!(panic = %panic_msg, "Push task panicked");
                shared.set_state(ConnectionState::Failed);
                shared.broadcast(&PushEvent::TransportDown {
                    reason: format!("push task panicked: {panic_msg}"),
                });
            }
        });

        command_tx
    }
}

#[async_trait]
impl PushPort for PushClient {
    async fn subscribe(
        &self,
        channel: &ChannelKey,
    ) -> Result<mpsc::UnboundedReceiver<PushEvent>, DeliveryError> {
        let topic = self.topic_for(channel);
        let (tx, rx) = mpsc::unbounded_channel();

        let state = self.shared.state();
        if state.is_degraded() {
            let _ = tx.send(PushEvent::TransportDown {
                reason: format!("push {state}"),
            });
        }

        self.shared.topics.lock().insert(
            topic.clone(),
            Subscriber {
                channel: channel.clone(),
                tx,
            },
        );

        self.ensure_running()
            .send(LoopCommand::Subscribe(topic.clone()))
            .map_err(|_| DeliveryError::push_unavailable("push connection task stopped"))?;

        info!(channel = %channel, topic = %topic, "Subscribed to push topic");
        Ok(rx)
    }

    async fn unsubscribe(&self, channel: &ChannelKey) {
        let topic = self.topic_for(channel);
        if self.shared.topics.lock().remove(&topic).is_none() {
            return;
        }

        if let Some(tx) = self.command_tx.lock().as_ref() {
            let _ = tx.send(LoopCommand::Unsubscribe(topic.clone()));
        }
        info!(channel = %channel, topic = %topic, "Unsubscribed from push topic");
    }
}

async fn run_push_loop(
    config: Arc<PushClientConfig>,
    connector: Connector,
    shared: Arc<Shared>,
    mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
) {
    let mut reconnect_attempts: u32 = 0;

    loop {
        shared.set_state(ConnectionState::Connecting);

        let result = run_single_connection(connector(), &config, &shared, &mut command_rx).await;

        let error = match result {
            ConnectionResult::Closed => {
                shared.set_state(ConnectionState::Disconnected);
                break;
            }
            ConnectionResult::Error(e) => {
                error!(error = %e, url = %config.url, "Failed to connect to push server");
                e
            }
            ConnectionResult::Disconnected(e) => {
                warn!(error = %e, "Push connection lost");
                reconnect_attempts = 0;
                e
            }
        };

        shared.broadcast(&PushEvent::TransportDown {
            reason: error.to_string(),
        });

        if !error.should_reconnect() || !config.auto_reconnect {
            shared.set_state(ConnectionState::Failed);
            break;
        }

        reconnect_attempts += 1;
        if reconnect_attempts > config.max_reconnect_attempts {
            error!(
                attempts = config.max_reconnect_attempts,
                "Max reconnection attempts exceeded"
            );
            shared.set_state(ConnectionState::Failed);
            break;
        }

        shared.set_state(ConnectionState::Reconnecting {
            attempt: reconnect_attempts,
        });

        let delay = if error.reconnect_immediately() {
            Duration::ZERO
        } else {
            calculate_backoff_delay(reconnect_attempts - 1)
        };
        info!(
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting to push server"
        );

        if !wait_before_retry(delay, &mut command_rx).await {
            shared.set_state(ConnectionState::Disconnected);
            break;
        }
    }

    info!("Push loop terminated");
}

enum ConnectionResult {
    /// The client handle went away.
    Closed,
    /// No usable connection was established.
    Error(PushError),
    /// An established connection dropped.
    Disconnected(PushError),
}

async fn run_single_connection(
    mut connection: Box<dyn PushConnection>,
    config: &PushClientConfig,
    shared: &Shared,
    command_rx: &mut mpsc::UnboundedReceiver<LoopCommand>,
) -> ConnectionResult {
    if let Err(e) = connection.connect(&config.url).await {
        return ConnectionResult::Error(e);
    }

    shared.set_state(ConnectionState::AwaitingEstablished);
    let activity_timeout = match await_established(connection.as_mut()).await {
        Ok(activity_timeout) => activity_timeout,
        Err(e) => {
            let _ = connection.disconnect().await;
            return ConnectionResult::Error(e);
        }
    };

    shared.set_state(ConnectionState::Connected);
    info!(
        activity_timeout_secs = activity_timeout.as_secs(),
        "Push connection established"
    );

    let mut session = PushSession {
        connection,
        subscribed: HashSet::new(),
        keepalive: KeepAlive::new(activity_timeout, PONG_TIMEOUT, Instant::now()),
    };

    let mut result = Ok(());
    for topic in shared.topic_names() {
        if let Err(e) = session.subscribe(&topic).await {
            result = Err(e);
            break;
        }
    }
    if result.is_ok() {
        result = session.run(shared, command_rx).await;
    }

    let _ = session.connection.disconnect().await;

    match result {
        Ok(()) => ConnectionResult::Closed,
        Err(e) => ConnectionResult::Disconnected(e),
    }
}

async fn await_established(connection: &mut dyn PushConnection) -> PushResult<Duration> {
    let deadline = Instant::now() + ESTABLISH_TIMEOUT;

    loop {
        let frame = timeout(deadline.saturating_duration_since(Instant::now()), connection.receive())
            .await
            .map_err(|_| PushError::timeout("connection_established"))??;

        match PushCodec::classify(frame)? {
            ServerMessage::ConnectionEstablished {
                socket_id,
                activity_timeout,
            } => {
                debug!(socket_id = %socket_id, "Push socket id assigned");
                return Ok(activity_timeout
                    .filter(|secs| *secs > 0)
                    .map_or(DEFAULT_ACTIVITY_TIMEOUT, Duration::from_secs));
            }
            ServerMessage::Error { code, message } => {
                return Err(PushError::Server { code, message });
            }
            other => trace!(frame = ?other, "Ignoring frame before handshake"),
        }
    }
}

struct PushSession {
    connection: Box<dyn PushConnection>,
    subscribed: HashSet<String>,
    keepalive: KeepAlive,
}

impl PushSession {
    async fn run(
        &mut self,
        shared: &Shared,
        command_rx: &mut mpsc::UnboundedReceiver<LoopCommand>,
    ) -> PushResult<()> {
        loop {
            let deadline = self.keepalive.next_deadline();

            tokio::select! {
                frame = self.connection.receive() => {
                    let frame = frame?;
                    self.keepalive.record_activity(Instant::now());
                    self.handle_frame(frame, shared).await?;
                }

                command = command_rx.recv() => match command {
                    Some(LoopCommand::Subscribe(topic)) => self.subscribe(&topic).await?,
                    Some(LoopCommand::Unsubscribe(topic)) => self.unsubscribe(&topic).await?,
                    None => return Ok(()),
                },

                () = sleep_until(deadline) => match self.keepalive.poll(Instant::now()) {
                    KeepAliveAction::SendPing => {
                        trace!("Sending keepalive ping");
                        self.connection.send(&PushFrame::ping()).await?;
                    }
                    KeepAliveAction::TimedOut => return Err(PushError::PongTimeout),
                    KeepAliveAction::Wait => {}
                },
            }
        }
    }

    async fn subscribe(&mut self, topic: &str) -> PushResult<()> {
        if self.subscribed.insert(topic.to_string()) {
            self.connection.send(&PushFrame::subscribe(topic)).await?;
            debug!(topic, "Sent subscribe");
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &str) -> PushResult<()> {
        if self.subscribed.remove(topic) {
            self.connection.send(&PushFrame::unsubscribe(topic)).await?;
            debug!(topic, "Sent unsubscribe");
        }
        Ok(())
    }

    async fn handle_frame(&mut self, frame: PushFrame, shared: &Shared) -> PushResult<()> {
        let message = match PushCodec::classify(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Malformed push frame");
                return Ok(());
            }
        };

        match message {
            ServerMessage::SubscriptionSucceeded { topic } => {
                info!(topic = %topic, "Push subscription confirmed");
                shared.send_to(&topic, PushEvent::TransportUp);
            }
            ServerMessage::SubscriptionFailed { topic, message } => {
                warn!(topic = %topic, error = %message, "Push subscription refused");
                self.subscribed.remove(&topic);
                shared.send_to(
                    &topic,
                    PushEvent::TransportDown {
                        reason: format!("subscription refused: {message}"),
                    },
                );
            }
            ServerMessage::Ping => self.connection.send(&PushFrame::pong()).await?,
            ServerMessage::Pong => trace!("Keepalive pong"),
            ServerMessage::Error { code, message } => {
                if code.and_then(PushErrorCode::classify).is_some() {
                    return Err(PushError::Server { code, message });
                }
                warn!(code = ?code, error = %message, "Push server reported an error");
            }
            ServerMessage::ChannelEvent { topic, frame } => shared.dispatch(&topic, &frame),
            ServerMessage::ConnectionEstablished { .. } | ServerMessage::Ignored { .. } => {}
        }

        Ok(())
    }
}

/// Sleeps for `delay`. Returns false if the client handle went away meanwhile.
async fn wait_before_retry(
    delay: Duration,
    command_rx: &mut mpsc::UnboundedReceiver<LoopCommand>,
) -> bool {
    let deadline = Instant::now() + delay;

    loop {
        tokio::select! {
            () = sleep_until(deadline) => return true,
            command = command_rx.recv() => match command {
                Some(command) => trace!(command = ?command, "Deferred until reconnect"),
                None => return false,
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    let jitter = rand_jitter(jitter_max);
    let total_delay = capped_delay.saturating_add(jitter);

    Duration::from_millis(total_delay)
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;

    struct ScriptedConnection {
        incoming: mpsc::UnboundedReceiver<PushResult<PushFrame>>,
        outgoing: mpsc::UnboundedSender<PushFrame>,
        refuse: bool,
        connected: bool,
    }

    struct ScriptedServer {
        to_client: mpsc::UnboundedSender<PushResult<PushFrame>>,
        from_client: mpsc::UnboundedReceiver<PushFrame>,
    }

    impl ScriptedServer {
        fn send(&self, frame: PushFrame) {
            self.to_client.send(Ok(frame)).unwrap();
        }

        fn established(&self, activity_timeout: u64) {
            self.send(PushFrame::new(
                "pusher:connection_established",
                None,
                Some(json!({ "socket_id": "1.1", "activity_timeout": activity_timeout }).to_string().into()),
            ));
        }

        fn succeeded(&self, topic: &str) {
            self.send(PushFrame::new(
                "pusher_internal:subscription_succeeded",
                Some(topic.into()),
                Some(json!({})),
            ));
        }

        async fn next_frame(&mut self) -> PushFrame {
            self.from_client.recv().await.unwrap()
        }
    }

    fn scripted() -> (ScriptedServer, ScriptedConnection) {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        (
            ScriptedServer {
                to_client,
                from_client,
            },
            ScriptedConnection {
                incoming,
                outgoing,
                refuse: false,
                connected: false,
            },
        )
    }

    fn refusing() -> ScriptedConnection {
        let (_, connection) = scripted();
        ScriptedConnection {
            refuse: true,
            ..connection
        }
    }

    #[async_trait]
    impl PushConnection for ScriptedConnection {
        async fn connect(&mut self, _url: &str) -> PushResult<()> {
            if self.refuse {
                return Err(PushError::connection_failed("refused"));
            }
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> PushResult<()> {
            self.connected = false;
            Ok(())
        }

        async fn send(&mut self, frame: &PushFrame) -> PushResult<()> {
            self.outgoing
                .send(frame.clone())
                .map_err(|_| PushError::NotConnected)
        }

        async fn receive(&mut self) -> PushResult<PushFrame> {
            match self.incoming.recv().await {
                Some(result) => result,
                None => Err(PushError::ConnectionClosed {
                    code: 1006,
                    reason: "script ended".into(),
                }),
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn connector(connections: Vec<ScriptedConnection>) -> Connector {
        let queue = Arc::new(Mutex::new(VecDeque::from(connections)));
        Arc::new(move || {
            let next = queue.lock().pop_front().unwrap_or_else(refusing);
            Box::new(next) as Box<dyn PushConnection>
        })
    }

    fn key() -> ChannelKey {
        ChannelKey::new("c1", "ch1")
    }

    #[test]
    fn test_config_builder() {
        let config = PushClientConfig::new("ws://push.test")
            .with_topic_prefix("community-channel-")
            .with_auto_reconnect(false)
            .with_max_reconnect_attempts(5);

        assert_eq!(config.url, "ws://push.test");
        assert_eq!(config.topic_prefix, "community-channel-");
        assert!(!config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_backoff_delay() {
        let delay0 = calculate_backoff_delay(0);
        let delay1 = calculate_backoff_delay(1);
        let delay2 = calculate_backoff_delay(2);

        assert!(delay0 < delay1);
        assert!(delay1 < delay2);

        let delay_max = calculate_backoff_delay(100);
        assert!(delay_max <= RECONNECT_DELAY_MAX + RECONNECT_JITTER_MAX);
    }

    #[test]
    fn test_topic_naming() {
        let client = PushClient::with_connector(PushClientConfig::default(), connector(vec![]));
        assert_eq!(client.topic_for(&key()), "channel-ch1");
        assert!(!client.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_flow_and_resubscribe_after_drop() {
        let (mut first, first_conn) = scripted();
        let (mut second, second_conn) = scripted();
        first.established(120);
        second.established(120);

        let client = PushClient::with_connector(
            PushClientConfig::default(),
            connector(vec![first_conn, second_conn]),
        );
        let mut rx = client.subscribe(&key()).await.unwrap();

        assert_eq!(first.next_frame().await, PushFrame::subscribe("channel-ch1"));
        first.succeeded("channel-ch1");
        assert_eq!(rx.recv().await, Some(PushEvent::TransportUp));
        assert!(client.state().is_connected());

        first.send(PushFrame::new(
            "message-deleted",
            Some("channel-ch1".into()),
            Some(json!({ "messageId": "m1" }).to_string().into()),
        ));
        assert_eq!(
            rx.recv().await,
            Some(PushEvent::MessageDeleted {
                message_id: "m1".into()
            })
        );

        first
            .to_client
            .send(Err(PushError::ConnectionClosed {
                code: 1006,
                reason: "reset".into(),
            }))
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(PushEvent::TransportDown { .. })
        ));

        assert_eq!(second.next_frame().await, PushFrame::subscribe("channel-ch1"));
        second.succeeded("channel-ch1");
        assert_eq!(rx.recv().await, Some(PushEvent::TransportUp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_ping_is_answered() {
        let (mut server, conn) = scripted();
        server.established(120);

        let client = PushClient::with_connector(PushClientConfig::default(), connector(vec![conn]));
        let _rx = client.subscribe(&key()).await.unwrap();
        server.next_frame().await;

        server.send(PushFrame::ping());
        assert_eq!(server.next_frame().await, PushFrame::pong());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_sends_frame() {
        let (mut server, conn) = scripted();
        server.established(120);

        let client = PushClient::with_connector(PushClientConfig::default(), connector(vec![conn]));
        let _rx = client.subscribe(&key()).await.unwrap();
        server.next_frame().await;

        client.unsubscribe(&key()).await;
        assert_eq!(server.next_frame().await, PushFrame::unsubscribe("channel-ch1"));

        client.unsubscribe(&key()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_triggers_ping_then_timeout() {
        let (mut server, conn) = scripted();
        server.established(30);

        let client = PushClient::with_connector(
            PushClientConfig::default().with_auto_reconnect(false),
            connector(vec![conn]),
        );
        let mut rx = client.subscribe(&key()).await.unwrap();
        server.next_frame().await;

        assert_eq!(server.next_frame().await, PushFrame::ping());

        let Some(PushEvent::TransportDown { reason }) = rx.recv().await else {
            panic!("expected transport down");
        };
        assert!(reason.contains("pong"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.state(), ConnectionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_reconnecting() {
        let (mut server, conn) = scripted();
        server.established(120);

        let client = PushClient::with_connector(PushClientConfig::default(), connector(vec![conn]));
        let mut rx = client.subscribe(&key()).await.unwrap();
        server.next_frame().await;

        server.send(PushFrame::new(
            "pusher:error",
            None,
            Some(json!({ "code": 4001, "message": "Application does not exist" })),
        ));
        assert!(matches!(
            rx.recv().await,
            Some(PushEvent::TransportDown { .. })
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let client = PushClient::with_connector(
            PushClientConfig::default().with_max_reconnect_attempts(2),
            connector(vec![]),
        );
        let mut rx = client.subscribe(&key()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(client.state(), ConnectionState::Failed);

        let mut downs = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, PushEvent::TransportDown { .. }));
            downs += 1;
        }
        assert_eq!(downs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_while_reconnecting_reports_down() {
        let client = PushClient::with_connector(PushClientConfig::default(), connector(vec![]));
        let _first = client.subscribe(&key()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(client.state().is_degraded());

        let mut rx = client
            .subscribe(&ChannelKey::new("c1", "ch2"))
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv(),
            Ok(PushEvent::TransportDown { .. })
        ));
    }
}
