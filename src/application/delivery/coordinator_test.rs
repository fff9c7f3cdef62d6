use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use super::{ChannelSnapshot, DeliveryConfig, DeliveryCoordinator};
use crate::application::services::ReadStateTracker;
use crate::domain::TransportStatus;
use crate::domain::entities::{ChannelKey, Message, MessageAuthor, MessageId, MessagePatch};
use crate::domain::errors::DeliveryError;
use crate::domain::ports::mocks::{MockChatData, MockPush};
use crate::domain::ports::{ChatDataPort, MockReadCachePort, PushEvent, TypingAction};
use crate::infrastructure::{InMemoryMessageStore, InMemoryPushHub};

struct Harness {
    store: Arc<MockChatData>,
    push: Arc<MockPush>,
    coordinator: DeliveryCoordinator,
    rx: watch::Receiver<ChannelSnapshot>,
    handle: tokio::task::JoinHandle<()>,
}

fn channel() -> ChannelKey {
    ChannelKey::new("c1", "ch")
}

fn msg(id: &str, author: &str, offset_ms: i64) -> Message {
    Message::new(
        id.into(),
        "ch".into(),
        MessageAuthor::new(author, author),
        format!("body of {id}"),
        Utc::now() - chrono::Duration::minutes(5) + chrono::Duration::milliseconds(offset_ms),
    )
}

fn reads_for(store: Arc<dyn ChatDataPort>) -> Arc<ReadStateTracker> {
    let mut cache = MockReadCachePort::new();
    cache.expect_store().returning(|_, _| Ok(()));
    cache.expect_load_all().returning(|| Ok(HashMap::new()));

    Arc::new(ReadStateTracker::new("me".into(), store, Arc::new(cache)))
}

fn harness() -> Harness {
    let store = Arc::new(MockChatData::new("me"));
    let push = Arc::new(MockPush::new());
    let reads = reads_for(store.clone());
    let (coordinator, handle) =
        DeliveryCoordinator::spawn(store.clone(), push.clone(), reads, DeliveryConfig::default());
    let rx = coordinator.subscribe();

    Harness {
        store,
        push,
        coordinator,
        rx,
        handle,
    }
}

async fn wait_for(
    rx: &mut watch::Receiver<ChannelSnapshot>,
    predicate: impl FnMut(&ChannelSnapshot) -> bool,
) -> ChannelSnapshot {
    timeout(Duration::from_secs(120), rx.wait_for(predicate))
        .await
        .expect("snapshot condition not reached")
        .expect("coordinator stopped")
        .clone()
}

fn ids(snapshot: &ChannelSnapshot) -> Vec<&str> {
    snapshot.messages.iter().map(|m| m.id().as_str()).collect()
}

async fn open(h: &mut Harness) -> ChannelSnapshot {
    h.coordinator.select_channel(channel()).unwrap();
    wait_for(&mut h.rx, |s| s.loaded).await
}

#[tokio::test(start_paused = true)]
async fn test_push_and_poll_deliver_message_once() {
    let mut h = harness();
    h.store.seed(msg("A", "bob", 0));
    h.store.seed(msg("B", "bob", 1));

    let snapshot = open(&mut h).await;
    assert_eq!(ids(&snapshot), vec!["A", "B"]);

    let c = msg("C", "carol", 2);
    h.store.seed(c.clone());
    sleep(Duration::from_secs(16)).await;
    wait_for(&mut h.rx, |s| s.messages.len() == 3).await;

    h.push.emit(&channel(), PushEvent::NewMessage { message: c });
    sleep(Duration::from_millis(10)).await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(ids(&snapshot), vec!["A", "B", "C"]);
    assert_eq!(
        h.store.list_calls(),
        vec![None, Some(MessageId::new("B"))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_push_first_then_poll_returns_same_message() {
    let mut h = harness();
    h.store.seed(msg("A", "bob", 0));
    open(&mut h).await;

    let c = msg("C", "carol", 2);
    h.push.emit(&channel(), PushEvent::NewMessage { message: c.clone() });
    wait_for(&mut h.rx, |s| s.messages.len() == 2).await;

    h.store.seed(c);
    sleep(Duration::from_secs(31)).await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(ids(&snapshot), vec!["A", "C"]);
}

#[tokio::test(start_paused = true)]
async fn test_send_ack_after_poll_delivery_is_deduplicated() {
    let mut h = harness();
    open(&mut h).await;

    h.store.seed(msg("sent-0", "me", 10));
    sleep(Duration::from_secs(16)).await;
    wait_for(&mut h.rx, |s| s.messages.len() == 1).await;

    let sent = h.coordinator.send_message("hello", None).await.unwrap();
    assert_eq!(sent.id().as_str(), "sent-0");

    let snapshot = h.coordinator.snapshot();
    assert_eq!(ids(&snapshot), vec!["sent-0"]);
}

#[tokio::test(start_paused = true)]
async fn test_sent_message_is_merged_before_return() {
    let mut h = harness();
    open(&mut h).await;

    let sent = h.coordinator.send_message("  hi all ", None).await.unwrap();
    assert_eq!(sent.content(), "hi all");
    assert!(h.coordinator.snapshot().message(sent.id()).is_some());

    h.push.emit(&channel(), PushEvent::NewMessage { message: sent.clone() });
    sleep(Duration::from_secs(16)).await;
    assert_eq!(h.coordinator.snapshot().messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_is_not_merged() {
    let mut h = harness();
    open(&mut h).await;
    h.store.set_fail_writes(true);

    let err = h.coordinator.send_message("lost", None).await.unwrap_err();
    assert!(err.is_write());
    assert!(h.coordinator.snapshot().messages.is_empty());

    let err = h.coordinator.send_message("   ", None).await.unwrap_err();
    assert!(err.is_write());
}

#[tokio::test(start_paused = true)]
async fn test_actions_without_open_channel() {
    let h = harness();

    let err = h.coordinator.send_message("hello", None).await.unwrap_err();
    assert_eq!(err, DeliveryError::NoActiveChannel);

    let err = h
        .coordinator
        .toggle_reaction(MessageId::new("m"), "👍")
        .await
        .unwrap_err();
    assert_eq!(err, DeliveryError::NoActiveChannel);
}

#[tokio::test(start_paused = true)]
async fn test_keystrokes_emit_single_start_and_stop() {
    let mut h = harness();
    open(&mut h).await;

    for _ in 0..6 {
        h.coordinator.keystroke().unwrap();
        sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(h.store.typing_actions(), vec![TypingAction::Start]);

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(
        h.store.typing_actions(),
        vec![TypingAction::Start, TypingAction::Stop]
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_ends_typing_session() {
    let mut h = harness();
    open(&mut h).await;

    h.coordinator.keystroke().unwrap();
    h.coordinator.send_message("done", None).await.unwrap();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(
        h.store.typing_actions(),
        vec![TypingAction::Start, TypingAction::Stop]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reaction_toggle_refreshes_view() {
    let mut h = harness();
    h.store.seed(msg("M", "bob", 0));
    open(&mut h).await;

    let summary = h
        .coordinator
        .toggle_reaction(MessageId::new("M"), "👍")
        .await
        .unwrap();
    assert_eq!(summary.count("👍"), 1);
    assert!(summary.reacted("👍"));
    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.messages[0].reactions().count("👍"), 1);

    let summary = h
        .coordinator
        .toggle_reaction(MessageId::new("M"), "👍")
        .await
        .unwrap();
    assert_eq!(summary.count("👍"), 0);
    assert!(!summary.reacted("👍"));
    assert!(h.coordinator.snapshot().messages[0].reactions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reaction_on_message_older_than_recent_window() {
    let hub = Arc::new(InMemoryPushHub::new());
    let store = Arc::new(
        InMemoryMessageStore::new(MessageAuthor::new("me", "Me"), hub.clone()).with_page_size(3),
    );
    for (i, id) in ["A", "B", "C"].into_iter().enumerate() {
        store.seed(&channel(), msg(id, "bob", i64::try_from(i).unwrap()));
    }

    let (coordinator, handle) = DeliveryCoordinator::spawn(
        store.clone(),
        hub,
        reads_for(store.clone()),
        DeliveryConfig::default(),
    );
    let mut rx = coordinator.subscribe();
    coordinator.select_channel(channel()).unwrap();
    wait_for(&mut rx, |s| s.loaded).await;

    coordinator.send_message("D", None).await.unwrap();
    let recent = store.list_messages(&channel(), None).await.unwrap();
    assert!(recent.iter().all(|m| m.id().as_str() != "A"));

    let summary = coordinator
        .toggle_reaction(MessageId::new("A"), "👍")
        .await
        .unwrap();
    assert_eq!(summary.count("👍"), 1);
    assert!(summary.reacted("👍"));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.messages.len(), 4);
    assert_eq!(ids(&snapshot)[..3], ["A", "B", "C"]);
    assert_eq!(snapshot.messages[0].reactions().count("👍"), 1);
    assert!(snapshot.messages[0].reactions().reacted("👍"));

    coordinator.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dwell_marks_read_and_new_message_counts_as_unread() {
    let mut h = harness();
    for i in 0..5 {
        h.store.seed(msg(&format!("m{i}"), "bob", i));
    }

    let snapshot = open(&mut h).await;
    assert_eq!(snapshot.unread, 5);
    assert!(snapshot.read_marker.is_none());

    sleep(Duration::from_millis(1200)).await;
    let snapshot = wait_for(&mut h.rx, |s| s.unread == 0).await;
    let marker = snapshot.read_marker.unwrap();
    assert!(
        snapshot
            .messages
            .iter()
            .all(|m| m.created_at() <= marker.timestamp())
    );
    assert_eq!(h.store.read_marks(), 1);

    let sixth = Message::new(
        "m5".into(),
        "ch".into(),
        MessageAuthor::new("bob", "bob"),
        "one more",
        Utc::now() + chrono::Duration::seconds(1),
    );
    h.push.emit(&channel(), PushEvent::NewMessage { message: sixth });
    let snapshot = wait_for(&mut h.rx, |s| s.messages.len() == 6).await;
    assert_eq!(snapshot.unread, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dwell_restarts_while_messages_keep_arriving() {
    let mut h = harness();
    h.store.seed(msg("m0", "bob", 0));
    open(&mut h).await;

    for i in 1..4 {
        sleep(Duration::from_millis(600)).await;
        h.push.emit(
            &channel(),
            PushEvent::NewMessage {
                message: msg(&format!("m{i}"), "bob", i),
            },
        );
    }
    sleep(Duration::from_millis(100)).await;
    assert_eq!(h.store.read_marks(), 0);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(h.store.read_marks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_switching_channel_tears_down_previous_view() {
    let mut h = harness();
    open(&mut h).await;
    assert_eq!(h.push.active(), 1);

    h.coordinator.keystroke().unwrap();
    h.coordinator
        .select_channel(ChannelKey::new("c1", "other"))
        .unwrap();
    let snapshot = wait_for(&mut h.rx, |s| {
        s.channel.as_ref().is_some_and(|c| c.channel.as_str() == "other") && s.loaded
    })
    .await;
    assert!(snapshot.messages.is_empty());

    assert_eq!(h.push.unsubscribe_count(), 1);
    assert_eq!(h.push.active(), 1);
    assert_eq!(h.push.emit(&channel(), PushEvent::TransportUp), 0);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        h.store.typing_actions(),
        vec![TypingAction::Start, TypingAction::Stop]
    );
}

#[tokio::test(start_paused = true)]
async fn test_initial_load_finishing_after_switch_is_dropped() {
    let mut h = harness();
    let other = ChannelKey::new("c1", "other");
    h.store.seed(msg("A", "bob", 0));
    h.store.seed(Message::new(
        "X".into(),
        "other".into(),
        MessageAuthor::new("carol", "carol"),
        "over here",
        Utc::now(),
    ));

    h.store.hold_reads(&channel());
    h.coordinator.select_channel(channel()).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.store.list_calls(), vec![None]);
    assert!(!h.coordinator.snapshot().loaded);

    h.coordinator.select_channel(other.clone()).unwrap();
    let snapshot = wait_for(&mut h.rx, |s| s.channel.as_ref() == Some(&other) && s.loaded).await;
    assert_eq!(ids(&snapshot), vec!["X"]);

    h.store.release_reads(&channel());
    sleep(Duration::from_millis(10)).await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.channel, Some(other));
    assert_eq!(ids(&snapshot), vec!["X"]);
    assert_eq!(h.store.list_calls(), vec![None, None]);
}

#[tokio::test(start_paused = true)]
async fn test_reselecting_open_channel_is_a_no_op() {
    let mut h = harness();
    open(&mut h).await;
    h.coordinator.select_channel(channel()).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(h.push.subscribe_count(), 1);
    assert_eq!(h.push.unsubscribe_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_push_failure_falls_back_to_polling() {
    let mut h = harness();
    h.push.set_fail_subscribe(true);

    let snapshot = open(&mut h).await;
    assert_eq!(snapshot.transport, TransportStatus::PollOnly);

    h.store.seed(msg("late", "bob", 0));
    sleep(Duration::from_secs(16)).await;
    let snapshot = wait_for(&mut h.rx, |s| !s.messages.is_empty()).await;
    assert_eq!(ids(&snapshot), vec!["late"]);
}

#[tokio::test(start_paused = true)]
async fn test_transport_status_follows_push_events() {
    let mut h = harness();
    let snapshot = open(&mut h).await;
    assert_eq!(snapshot.transport, TransportStatus::Connecting);

    h.push.emit(&channel(), PushEvent::TransportUp);
    wait_for(&mut h.rx, |s| s.transport == TransportStatus::Live).await;

    h.push.emit(
        &channel(),
        PushEvent::TransportDown {
            reason: "socket reset".into(),
        },
    );
    wait_for(&mut h.rx, |s| s.transport == TransportStatus::PollOnly).await;

    h.store.seed(msg("missed", "bob", 0));
    h.push.emit(&channel(), PushEvent::TransportUp);
    let snapshot = wait_for(&mut h.rx, |s| s.messages.len() == 1).await;
    assert_eq!(snapshot.transport, TransportStatus::Live);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failures_are_retried() {
    let mut h = harness();
    h.store.set_fail_reads(true);
    h.store.seed(msg("A", "bob", 0));

    h.coordinator.select_channel(channel()).unwrap();
    sleep(Duration::from_secs(1)).await;
    assert!(!h.coordinator.snapshot().loaded);

    h.store.set_fail_reads(false);
    sleep(Duration::from_secs(15)).await;
    let snapshot = wait_for(&mut h.rx, |s| s.loaded).await;
    assert_eq!(ids(&snapshot), vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_and_delete_events() {
    let mut h = harness();
    h.store.seed(msg("A", "bob", 0));
    h.store.seed(msg("B", "bob", 1));
    open(&mut h).await;

    h.push.emit(
        &channel(),
        PushEvent::MessageUpdated {
            message_id: "A".into(),
            patch: MessagePatch::edit("fixed typo"),
        },
    );
    h.push.emit(
        &channel(),
        PushEvent::MessageDeleted {
            message_id: "B".into(),
        },
    );

    let snapshot = wait_for(&mut h.rx, |s| s.messages.iter().any(Message::is_deleted)).await;
    assert_eq!(ids(&snapshot), vec!["A", "B"]);
    assert_eq!(snapshot.messages[0].content(), "fixed typo");
    assert!(snapshot.messages[0].is_edited());
    assert!(snapshot.messages[1].is_deleted());
}

#[tokio::test(start_paused = true)]
async fn test_remote_typing_indicator_expires() {
    let mut h = harness();
    open(&mut h).await;

    h.push.emit(
        &channel(),
        PushEvent::UserTyping {
            user_id: "me".into(),
            user_name: "Me".into(),
        },
    );
    h.push.emit(
        &channel(),
        PushEvent::UserTyping {
            user_id: "bob".into(),
            user_name: "Bob".into(),
        },
    );
    let snapshot = wait_for(&mut h.rx, |s| !s.typing.is_empty()).await;
    assert_eq!(snapshot.typing, vec!["Bob".to_string()]);
    assert_eq!(
        snapshot.typing_indicator(),
        Some("Bob is typing...".to_string())
    );

    sleep(Duration::from_millis(2100)).await;
    assert!(h.coordinator.snapshot().typing.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remote_stop_removes_indicator() {
    let mut h = harness();
    open(&mut h).await;

    h.push.emit(
        &channel(),
        PushEvent::UserTyping {
            user_id: "bob".into(),
            user_name: "Bob".into(),
        },
    );
    wait_for(&mut h.rx, |s| !s.typing.is_empty()).await;
    h.push.emit(
        &channel(),
        PushEvent::UserStoppedTyping {
            user_id: "bob".into(),
        },
    );
    wait_for(&mut h.rx, |s| s.typing.is_empty()).await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_worker() {
    let mut h = harness();
    open(&mut h).await;

    h.coordinator.shutdown();
    h.handle.await.unwrap();

    assert_eq!(h.push.unsubscribe_count(), 1);
    assert_eq!(
        h.coordinator.select_channel(channel()),
        Err(DeliveryError::CoordinatorClosed)
    );
    assert!(!h.coordinator.snapshot().is_open());
}
