//! Huddle - real-time channel messaging core.
//!
//! One open channel is kept as a deduplicated, ordered timeline fed by both a
//! push subscription and a poll loop, with typing presence, read markers and
//! reaction toggles layered on top.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the channel-view services and coordinator.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing the console front-end.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "huddle";
