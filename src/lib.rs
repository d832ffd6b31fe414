//! Terminal client for a discussion forum REST backend.
//!
//! The feed core ([`feed`]) keeps a window of discussions synchronized with
//! the server: first page, older pages on demand, a periodic count of unseen
//! records, newer records on demand and confirmed deletion. It depends only
//! on the [`feed::DiscussionSource`] contract and the
//! [`session::CurrentIdentity`] accessor, so it runs without a terminal.
//!
//! The binary puts a ratatui front end ([`ui`]) and a set of subcommands on
//! top of it.

pub mod api;
pub mod app;
pub mod compose;
pub mod config;
pub mod directory;
pub mod feed;
pub mod presenter;
pub mod profile;
pub mod session;
pub mod ui;
pub mod util;
