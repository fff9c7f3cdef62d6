//! Presentation layer: console front-end.

/// Console input parsing.
pub mod commands;
/// Snapshot rendering and the console loop.
pub mod console;

pub use commands::ConsoleCommand;
pub use console::{ConsoleApp, ConsoleView};
