//! Line-oriented front-end over the delivery coordinator.

use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::commands::{ConsoleCommand, HELP_TEXT};
use crate::application::{ChannelSnapshot, DeliveryCoordinator};
use crate::domain::TransportStatus;
use crate::domain::entities::{ChannelKey, Message, MessageId};

const SHORT_ID_LEN: usize = 8;

/// Turns successive snapshots into the lines that changed.
#[derive(Debug, Default)]
pub struct ConsoleView {
    channel: Option<ChannelKey>,
    rendered: HashMap<MessageId, String>,
    typing: Option<String>,
    status: Option<(TransportStatus, usize)>,
}

impl ConsoleView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for `snapshot`, given everything printed before.
    pub fn render(&mut self, snapshot: &ChannelSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.channel != self.channel {
            self.rendered.clear();
            self.typing = None;
            self.status = None;
            self.channel.clone_from(&snapshot.channel);
            if let Some(channel) = &snapshot.channel {
                lines.push(format!("== #{} ({}) ==", channel.channel, channel.community));
            }
        }

        for message in &snapshot.messages {
            let line = format_message(message);
            match self.rendered.get(message.id()) {
                Some(previous) if *previous == line => {}
                Some(_) => {
                    lines.push(format!("~ {line}"));
                    self.rendered.insert(message.id().clone(), line);
                }
                None => {
                    lines.push(line.clone());
                    self.rendered.insert(message.id().clone(), line);
                }
            }
        }

        let typing = snapshot.typing_indicator();
        if typing != self.typing {
            if let Some(indicator) = &typing {
                lines.push(format!("  {indicator}"));
            }
            self.typing = typing;
        }

        let status = (snapshot.transport, snapshot.unread);
        if snapshot.is_open() && self.status != Some(status) {
            lines.push(format!("[{}] unread: {}", status.0, status.1));
            self.status = Some(status);
        }

        lines
    }
}

#[must_use]
pub fn short_id(id: &MessageId) -> &str {
    let value = id.as_str();
    value
        .char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(value, |(end, _)| &value[..end])
}

#[must_use]
pub fn format_message(message: &Message) -> String {
    let mut line = format!(
        "{} {} <{}>",
        message.formatted_timestamp(),
        short_id(message.id()),
        message.author().name
    );

    if let Some(reply) = message.reply_to() {
        line.push_str(&format!(" ↳{}", reply.author_name));
    }

    if message.is_deleted() {
        line.push_str(" (deleted)");
        return line;
    }

    line.push(' ');
    line.push_str(message.content());
    if message.is_edited() {
        line.push_str(" (edited)");
    }

    if !message.reactions().is_empty() {
        let reactions: Vec<String> = message
            .reactions()
            .iter()
            .map(|r| {
                let marker = if r.reacted { "*" } else { "" };
                format!("{}{}{marker}", r.emoji, r.count)
            })
            .collect();
        line.push_str(&format!(" [{}]", reactions.join(" ")));
    }

    line
}

/// Finds the message a user-typed id or id prefix refers to.
#[must_use]
pub fn resolve_target(snapshot: &ChannelSnapshot, target: &str) -> Option<MessageId> {
    let mut matches = snapshot
        .messages
        .iter()
        .filter(|m| m.id().as_str().starts_with(target));
    let first = matches.next()?;
    if matches.next().is_some() && first.id().as_str() != target {
        return None;
    }
    Some(first.id().clone())
}

/// Console session: stdin commands in, snapshot changes out.
pub struct ConsoleApp<W> {
    coordinator: DeliveryCoordinator,
    view: ConsoleView,
    out: W,
}

impl<W: AsyncWrite + Unpin> ConsoleApp<W> {
    pub fn new(coordinator: DeliveryCoordinator, out: W) -> Self {
        Self {
            coordinator,
            view: ConsoleView::new(),
            out,
        }
    }

    /// Runs until `/quit`, end of input, or the coordinator stops.
    ///
    /// # Errors
    /// Returns IO error if writing output fails.
    pub async fn run<R>(mut self, input: R) -> std::io::Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        let mut snapshots = self.coordinator.subscribe();

        let initial = snapshots.borrow_and_update().clone();
        self.print_snapshot(&initial).await?;

        loop {
            tokio::select! {
                biased;

                changed = snapshots.changed() => {
                    if changed.is_err() {
                        info!("Coordinator stopped, leaving console");
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.print_snapshot(&snapshot).await?;
                }

                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("End of input");
                        break;
                    };
                    if !self.handle_line(&line).await? {
                        break;
                    }
                }
            }
        }

        self.out.flush().await
    }

    async fn print_snapshot(&mut self, snapshot: &ChannelSnapshot) -> std::io::Result<()> {
        for line in self.view.render(snapshot) {
            self.write_line(&line).await?;
        }
        self.out.flush().await
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await
    }

    /// Returns false when the session should end.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<bool> {
        match ConsoleCommand::parse(line) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => return Ok(false),
            ConsoleCommand::Help => self.write_line(HELP_TEXT).await?,
            ConsoleCommand::Invalid(hint) => self.write_line(&format!("! {hint}")).await?,
            ConsoleCommand::Typing => {
                if let Err(e) = self.coordinator.keystroke() {
                    warn!(error = %e, "Keystroke not delivered");
                    return Ok(false);
                }
            }
            ConsoleCommand::Channel(name) => {
                let Some(current) = self.coordinator.snapshot().channel else {
                    self.write_line("! no community open").await?;
                    return Ok(true);
                };
                let key = ChannelKey::new(current.community, name.as_str());
                if self.coordinator.select_channel(key).is_err() {
                    return Ok(false);
                }
            }
            ConsoleCommand::Send(content) => {
                if let Err(e) = self.coordinator.send_message(content, None).await {
                    self.write_line(&format!("! send failed: {e}")).await?;
                }
            }
            ConsoleCommand::Reply { target, content } => {
                let Some(id) = resolve_target(&self.coordinator.snapshot(), &target) else {
                    self.write_line(&format!("! no message matches {target}")).await?;
                    return Ok(true);
                };
                if let Err(e) = self.coordinator.send_message(content, Some(id)).await {
                    self.write_line(&format!("! reply failed: {e}")).await?;
                }
            }
            ConsoleCommand::React { target, emoji } => {
                let Some(id) = resolve_target(&self.coordinator.snapshot(), &target) else {
                    self.write_line(&format!("! no message matches {target}")).await?;
                    return Ok(true);
                };
                if let Err(e) = self.coordinator.toggle_reaction(id, emoji).await {
                    self.write_line(&format!("! reaction failed: {e}")).await?;
                }
            }
        }
        Ok(true)
    }
}
