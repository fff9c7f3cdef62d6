//! Single-writer task that owns the open channel view.
//!
//! UI commands, push events, timer expiries and completions of spawned network
//! calls are all handled on this task, one at a time. Network calls never run
//! here; they are spawned and report back through the ingress channel tagged
//! with the session generation, so results for a channel that has since been
//! closed are dropped.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::Either;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

use crate::application::services::{ReactionAggregator, ReadStateTracker, TimerArena, TimerKind};
use crate::domain::TransportStatus;
use crate::domain::entities::{
    ChannelKey, Message, MessageId, ReactionSummary, ReadMarker, UserId,
};
use crate::domain::errors::{ApiError, DeliveryError};
use crate::domain::ports::{ChatDataPort, PushEvent, PushPort, SendMessageRequest, TypingAction};

use super::config::DeliveryConfig;
use super::events::{ChannelSnapshot, CoordinatorCommand, Ingress, Responder};
use super::session::ChannelSession;

pub struct CoordinatorWorker {
    store: Arc<dyn ChatDataPort>,
    push: Arc<dyn PushPort>,
    reads: Arc<ReadStateTracker>,
    reactions: ReactionAggregator,
    config: DeliveryConfig,
    viewer: UserId,
    command_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
    ingress_tx: mpsc::UnboundedSender<Ingress>,
    ingress_rx: mpsc::UnboundedReceiver<Ingress>,
    snapshot_tx: watch::Sender<ChannelSnapshot>,
    session: Option<ChannelSession>,
    timers: TimerArena,
    next_generation: u64,
    revision: u64,
}

impl CoordinatorWorker {
    pub fn new(
        store: Arc<dyn ChatDataPort>,
        push: Arc<dyn PushPort>,
        reads: Arc<ReadStateTracker>,
        config: DeliveryConfig,
        command_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
        snapshot_tx: watch::Sender<ChannelSnapshot>,
    ) -> Self {
        let (ingress_tx, ingress_rx) = mpsc::unbounded_channel();
        Self {
            reactions: ReactionAggregator::new(store.clone()),
            viewer: reads.viewer().clone(),
            store,
            push,
            reads,
            config,
            command_rx,
            ingress_tx,
            ingress_rx,
            snapshot_tx,
            session: None,
            timers: TimerArena::new(),
            next_generation: 0,
            revision: 0,
        }
    }

    pub async fn run(mut self) {
        info!(viewer = %self.viewer, "Delivery coordinator started");

        loop {
            let deadline = self.timers.next_deadline();

            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(CoordinatorCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },

                Some(ingress) = self.ingress_rx.recv() => self.handle_ingress(ingress),

                event = recv_push(&mut self.session) => self.handle_push(event),

                () = wait_until(deadline) => self.handle_timers(),
            }
        }

        self.teardown_session().await;
        self.publish();
        info!("Delivery coordinator stopped");
    }

    async fn handle_command(&mut self, command: CoordinatorCommand) {
        match command {
            CoordinatorCommand::SelectChannel { channel } => {
                if self.session.as_ref().is_some_and(|s| s.key == channel) {
                    debug!(channel = %channel, "Channel already open");
                    return;
                }
                self.teardown_session().await;
                self.open_session(channel).await;
            }
            CoordinatorCommand::CloseChannel => {
                self.teardown_session().await;
                self.publish();
            }
            CoordinatorCommand::SendMessage {
                content,
                reply_to,
                respond,
            } => self.send_message(content, reply_to, respond),
            CoordinatorCommand::ToggleReaction {
                message_id,
                emoji,
                respond,
            } => self.toggle_reaction(message_id, emoji, respond),
            CoordinatorCommand::Keystroke => self.keystroke(),
            CoordinatorCommand::Shutdown => {}
        }
    }

    async fn open_session(&mut self, key: ChannelKey) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let mut session =
            ChannelSession::new(generation, key.clone(), self.viewer.clone(), &self.config);

        match self.push.subscribe(&key).await {
            Ok(rx) => session.push = Some(rx),
            Err(e) => {
                warn!(channel = %key, error = %e, "Push subscription failed, polling only");
                session.transport = TransportStatus::PollOnly;
            }
        }

        info!(channel = %key, generation, transport = %session.transport, "Channel opened");

        session.poll_in_flight = true;
        self.session = Some(session);
        self.spawn_poll(generation, key, None, true);
        self.timers
            .arm(TimerKind::Poll, Instant::now() + self.config.poll_interval);
        self.publish();
    }

    async fn teardown_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.timers.clear();

        if let Some(TypingAction::Stop) = session.local_typing.finish() {
            self.spawn_typing(session.key.clone(), TypingAction::Stop);
        }

        session.push = None;
        self.push.unsubscribe(&session.key).await;

        info!(channel = %session.key, generation = session.generation, "Channel closed");
    }

    fn send_message(
        &mut self,
        content: String,
        reply_to: Option<MessageId>,
        respond: Responder<Message>,
    ) {
        let Some(session) = self.session.as_mut() else {
            let _ = respond.send(Err(DeliveryError::NoActiveChannel));
            return;
        };

        if content.trim().is_empty() {
            let _ = respond.send(Err(DeliveryError::write(
                "send message",
                ApiError::validation("Message content is required"),
            )));
            return;
        }

        let key = session.key.clone();
        let generation = session.generation;
        if let Some(action) = session.local_typing.finish() {
            self.timers.cancel(TimerKind::TypingIdle);
            self.spawn_typing(key.clone(), action);
        }

        let request = SendMessageRequest::new(key, content.trim()).with_reply(reply_to);
        let store = self.store.clone();
        let ingress_tx = self.ingress_tx.clone();

        tokio::spawn(async move {
            let result = store
                .send_message(request)
                .await
                .map_err(|e| DeliveryError::write("send message", e));
            let _ = ingress_tx.send(Ingress::Sent {
                generation,
                result,
                respond,
            });
        });
    }

    fn toggle_reaction(
        &self,
        message_id: MessageId,
        emoji: String,
        respond: Responder<ReactionSummary>,
    ) {
        let Some(session) = self.session.as_ref() else {
            let _ = respond.send(Err(DeliveryError::NoActiveChannel));
            return;
        };

        let generation = session.generation;
        let key = session.key.clone();
        let posted_at = session.timeline.get(&message_id).map(Message::created_at);
        let reactions = self.reactions.clone();
        let ingress_tx = self.ingress_tx.clone();

        tokio::spawn(async move {
            let result = reactions.toggle(&key, &message_id, posted_at, &emoji).await;
            let _ = ingress_tx.send(Ingress::ReactionsRefreshed {
                generation,
                result,
                respond,
            });
        });
    }

    fn keystroke(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let action = session.local_typing.on_keystroke(Instant::now());
        let key = session.key.clone();
        if let Some(deadline) = session.local_typing.deadline() {
            self.timers.arm(TimerKind::TypingIdle, deadline);
        }
        if let Some(action) = action {
            self.spawn_typing(key, action);
        }
    }

    fn handle_ingress(&mut self, ingress: Ingress) {
        let generation = ingress.generation();
        let current = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_current(generation));

        match ingress {
            Ingress::Polled { initial, result, .. } => {
                if !current {
                    debug!(generation, "Dropping poll result for closed channel");
                    return;
                }
                self.apply_poll(initial, result);
            }
            Ingress::Sent { result, respond, .. } => {
                if current && let Ok(message) = &result {
                    let inserted = self
                        .session
                        .as_mut()
                        .is_some_and(|s| s.timeline.insert(message.clone()).is_inserted());
                    if inserted {
                        self.timeline_changed();
                    }
                }
                if let Err(e) = &result {
                    warn!(error = %e, "Message was not sent");
                }
                let _ = respond.send(result);
            }
            Ingress::ReactionsRefreshed { result, respond, .. } => {
                match &result {
                    Ok(refresh) if current => {
                        let changed = self.session.as_mut().map_or(0, |s| {
                            s.timeline
                                .refresh_reactions(refresh.summaries.iter().map(|(id, r)| (id, r)))
                        });
                        if changed > 0 {
                            self.publish();
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Reaction toggle did not complete"),
                }
                let _ = respond.send(result.map(|refresh| refresh.target));
            }
            Ingress::ReadPersisted { result, .. } => match result {
                Ok(marker) => trace!(marker = %marker.to_rfc3339(), "Read marker persisted"),
                Err(e) => debug!(error = %e, "Read marker kept locally"),
            },
        }
    }

    fn apply_poll(&mut self, initial: bool, result: Result<Vec<Message>, ApiError>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.poll_in_flight = false;

        match result {
            Ok(batch) => {
                let received = batch.len();
                let inserted = session.timeline.merge_batch(batch);
                let first_load = initial && !session.loaded;
                session.loaded = true;
                debug!(
                    channel = %session.key,
                    received,
                    inserted,
                    initial,
                    "Poll merged"
                );
                if inserted > 0 || first_load {
                    self.timeline_changed();
                }
            }
            Err(e) => {
                warn!(channel = %session.key, error = %e, "Poll failed, retrying next tick");
            }
        }
    }

    fn handle_push(&mut self, event: Option<PushEvent>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let Some(event) = event else {
            warn!(channel = %session.key, "Push subscription ended, polling only");
            session.push = None;
            session.transport = TransportStatus::PollOnly;
            self.publish();
            return;
        };

        match event {
            PushEvent::NewMessage { message } => {
                if message.channel_id() != &session.key.channel {
                    debug!(channel = %message.channel_id(), "Ignoring message for another channel");
                    return;
                }
                if session.timeline.insert(message).is_inserted() {
                    self.timeline_changed();
                }
            }
            PushEvent::MessageUpdated { message_id, patch } => {
                if session.timeline.apply_patch(&message_id, patch) {
                    self.publish();
                } else {
                    debug!(message_id = %message_id, "Update for unknown message");
                }
            }
            PushEvent::MessageDeleted { message_id } => {
                if session.timeline.mark_deleted(&message_id) {
                    self.timeline_changed();
                } else {
                    debug!(message_id = %message_id, "Delete for unknown message");
                }
            }
            PushEvent::UserTyping { user_id, user_name } => {
                let changed = session.remote_typing.start(user_id, user_name, Instant::now());
                if let Some(expiry) = session.remote_typing.next_expiry() {
                    self.timers.arm(TimerKind::RemoteTypingSweep, expiry);
                }
                if changed {
                    self.publish();
                }
            }
            PushEvent::UserStoppedTyping { user_id } => {
                if session.remote_typing.stop(&user_id) {
                    self.publish();
                }
            }
            PushEvent::TransportUp => {
                let recovered = session.transport == TransportStatus::PollOnly;
                session.transport = TransportStatus::Live;
                info!(channel = %session.key, "Push transport live");
                if recovered {
                    self.timers.arm(TimerKind::Poll, Instant::now());
                }
                self.publish();
            }
            PushEvent::TransportDown { reason } => {
                warn!(channel = %session.key, reason = %reason, "Push transport down, polling only");
                session.transport = TransportStatus::PollOnly;
                self.publish();
            }
        }
    }

    fn handle_timers(&mut self) {
        let now = Instant::now();
        for kind in self.timers.pop_expired(now) {
            match kind {
                TimerKind::Poll => self.poll_tick(now),
                TimerKind::TypingIdle => self.typing_idle(now),
                TimerKind::ReadDwell => self.read_dwell_elapsed(),
                TimerKind::RemoteTypingSweep => self.sweep_remote_typing(now),
            }
        }
    }

    fn poll_tick(&mut self, now: Instant) {
        self.timers
            .arm(TimerKind::Poll, now + self.config.poll_interval);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.poll_in_flight {
            trace!(channel = %session.key, "Previous poll still in flight, skipping tick");
            return;
        }

        session.poll_in_flight = true;
        let initial = !session.loaded;
        let cursor = session.timeline.last_known_id().cloned();
        let (generation, key) = (session.generation, session.key.clone());
        self.spawn_poll(generation, key, cursor, initial);
    }

    fn typing_idle(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.local_typing.on_deadline(now) {
            Some(action) => {
                let key = session.key.clone();
                self.spawn_typing(key, action);
            }
            None => {
                if let Some(deadline) = session.local_typing.deadline() {
                    self.timers.arm(TimerKind::TypingIdle, deadline);
                }
            }
        }
    }

    fn read_dwell_elapsed(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(newest) = session.timeline.newest_created_at() else {
            return;
        };

        let candidate = ReadMarker::at(Utc::now().max(newest));
        let key = session.key.clone();
        let generation = session.generation;
        self.reads.advance_local(&key, candidate);
        self.publish();

        let reads = self.reads.clone();
        let ingress_tx = self.ingress_tx.clone();
        tokio::spawn(async move {
            let result = reads.mark_read(&key, candidate).await;
            let _ = ingress_tx.send(Ingress::ReadPersisted { generation, result });
        });
    }

    fn sweep_remote_typing(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let changed = session.remote_typing.sweep(now);
        if let Some(expiry) = session.remote_typing.next_expiry() {
            self.timers.arm(TimerKind::RemoteTypingSweep, expiry);
        }
        if changed {
            self.publish();
        }
    }

    /// Re-arms the read dwell and publishes.
    fn timeline_changed(&mut self) {
        if self.session.as_ref().is_some_and(|s| !s.timeline.is_empty()) {
            self.timers
                .arm(TimerKind::ReadDwell, Instant::now() + self.config.read_dwell);
        }
        self.publish();
    }

    fn spawn_poll(
        &self,
        generation: u64,
        key: ChannelKey,
        cursor: Option<MessageId>,
        initial: bool,
    ) {
        let store = self.store.clone();
        let ingress_tx = self.ingress_tx.clone();

        tokio::spawn(async move {
            let result = store.list_messages(&key, cursor.as_ref()).await;
            let _ = ingress_tx.send(Ingress::Polled {
                generation,
                initial,
                result,
            });
        });
    }

    fn spawn_typing(&self, key: ChannelKey, action: TypingAction) {
        let store = self.store.clone();

        tokio::spawn(async move {
            if let Err(e) = store.send_typing(&key, action).await {
                debug!(channel = %key, action = action.as_str(), error = %e, "Typing signal not delivered");
            }
        });
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = match self.session.as_ref() {
            Some(session) => ChannelSnapshot {
                channel: Some(session.key.clone()),
                messages: session.timeline.messages().to_vec(),
                typing: session.remote_typing.names(),
                transport: session.transport,
                unread: self
                    .reads
                    .channel_unread(&session.key, session.timeline.messages()),
                read_marker: self.reads.marker(&session.key),
                loaded: session.loaded,
                revision: self.revision,
            },
            None => ChannelSnapshot {
                revision: self.revision,
                ..ChannelSnapshot::default()
            },
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

async fn recv_push(session: &mut Option<ChannelSession>) -> Option<PushEvent> {
    let receiver = match session.as_mut().and_then(|s| s.push.as_mut()) {
        Some(rx) => Either::Left(rx.recv()),
        None => Either::Right(std::future::pending()),
    };
    receiver.await
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
