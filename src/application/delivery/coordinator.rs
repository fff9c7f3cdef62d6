use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::application::services::ReadStateTracker;
use crate::domain::entities::{ChannelKey, Message, MessageId, ReactionSummary};
use crate::domain::errors::DeliveryError;
use crate::domain::ports::{ChatDataPort, PushPort};

use super::config::DeliveryConfig;
use super::events::{ChannelSnapshot, CoordinatorCommand};
use super::worker::CoordinatorWorker;

/// Handle to the delivery worker. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryCoordinator {
    command_tx: mpsc::UnboundedSender<CoordinatorCommand>,
    snapshot_rx: watch::Receiver<ChannelSnapshot>,
}

impl DeliveryCoordinator {
    /// Starts the worker on the current runtime.
    #[must_use]
    pub fn spawn(
        store: Arc<dyn ChatDataPort>,
        push: Arc<dyn PushPort>,
        reads: Arc<ReadStateTracker>,
        config: DeliveryConfig,
    ) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ChannelSnapshot::default());

        let worker = CoordinatorWorker::new(store, push, reads, config, command_rx, snapshot_tx);
        let handle = tokio::spawn(worker.run());

        (
            Self {
                command_tx,
                snapshot_rx,
            },
            handle,
        )
    }

    /// Opens a channel, closing the previous one first.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::CoordinatorClosed` if the worker has stopped.
    pub fn select_channel(&self, channel: ChannelKey) -> Result<(), DeliveryError> {
        self.send(CoordinatorCommand::SelectChannel { channel })
    }

    /// Closes the open channel.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::CoordinatorClosed` if the worker has stopped.
    pub fn close_channel(&self) -> Result<(), DeliveryError> {
        self.send(CoordinatorCommand::CloseChannel)
    }

    /// Sends a message to the open channel and waits for the store's copy.
    ///
    /// The stored message is merged into the view before this returns.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Write` if the store did not accept the message
    /// and `DeliveryError::NoActiveChannel` if no channel is open.
    pub async fn send_message(
        &self,
        content: impl Into<String>,
        reply_to: Option<MessageId>,
    ) -> Result<Message, DeliveryError> {
        let (respond, rx) = oneshot::channel();
        self.send(CoordinatorCommand::SendMessage {
            content: content.into(),
            reply_to,
            respond,
        })?;
        rx.await.map_err(|_| DeliveryError::CoordinatorClosed)?
    }

    /// Toggles the viewer's reaction and returns the refreshed summary.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Write` if the toggle was not persisted and
    /// `DeliveryError::Transport` if the refresh afterwards failed.
    pub async fn toggle_reaction(
        &self,
        message_id: MessageId,
        emoji: impl Into<String>,
    ) -> Result<ReactionSummary, DeliveryError> {
        let (respond, rx) = oneshot::channel();
        self.send(CoordinatorCommand::ToggleReaction {
            message_id,
            emoji: emoji.into(),
            respond,
        })?;
        rx.await.map_err(|_| DeliveryError::CoordinatorClosed)?
    }

    /// Records a keystroke in the composer.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::CoordinatorClosed` if the worker has stopped.
    pub fn keystroke(&self) -> Result<(), DeliveryError> {
        self.send(CoordinatorCommand::Keystroke)
    }

    /// Watches view snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChannelSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Latest view snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Closes the open channel and stops the worker.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(CoordinatorCommand::Shutdown);
    }

    fn send(&self, command: CoordinatorCommand) -> Result<(), DeliveryError> {
        self.command_tx
            .send(command)
            .map_err(|_| DeliveryError::CoordinatorClosed)
    }
}
