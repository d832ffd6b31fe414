//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `render` - Layout and overlays (delete confirmation, compose)
//! - `helpers` - Spawning of background requests, panic capture
//! - `feed` - Discussion feed widget
//! - `users` - User directory widget
//! - `status` - Status bar widget
//! - `help` - Key table overlay

mod events;
mod feed;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;
mod users;

pub use loop_runner::{run, Action};
