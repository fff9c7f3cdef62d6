//! Console input parsing.

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Plain text to post in the open channel.
    Send(String),
    /// Reply to a message, addressed by id or id prefix.
    Reply { target: String, content: String },
    /// Toggle a reaction on a message.
    React { target: String, emoji: String },
    /// Open another channel of the current community.
    Channel(String),
    /// Record composer activity without sending.
    Typing,
    Help,
    Quit,
    /// Nothing to do (blank line).
    Empty,
    /// Malformed command with a usage hint.
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
/reply <id> <text>   reply to a message
/react <id> <emoji>  toggle a reaction
/channel <name>      switch channel
/typing              show as typing
/quit                exit
anything else is sent as a message";

impl ConsoleCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let (name, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, args)| (name, args.trim()));

        match name {
            "quit" | "q" | "exit" => Self::Quit,
            "help" | "h" => Self::Help,
            "typing" => Self::Typing,
            "channel" | "c" => match args.split_whitespace().next() {
                Some(channel) => Self::Channel(channel.to_string()),
                None => Self::Invalid("usage: /channel <name>".to_string()),
            },
            "react" | "r" => match split_target(args) {
                Some((target, emoji)) => Self::React {
                    target,
                    emoji: emoji.to_string(),
                },
                None => Self::Invalid("usage: /react <id> <emoji>".to_string()),
            },
            "reply" => match split_target(args) {
                Some((target, content)) => Self::Reply {
                    target,
                    content: content.to_string(),
                },
                None => Self::Invalid("usage: /reply <id> <text>".to_string()),
            },
            // "//text" posts "/text"
            _ if rest.starts_with('/') => Self::Send(rest.to_string()),
            other => Self::Invalid(format!("unknown command: /{other}")),
        }
    }
}

fn split_target(args: &str) -> Option<(String, &str)> {
    let (target, rest) = args.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    if target.is_empty() || rest.is_empty() {
        return None;
    }
    Some((target.to_string(), rest))
}
