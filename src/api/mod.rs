//! REST client for the forum backend.
//!
//! - [`client`] - `ApiClient`: account, user, and discussion endpoints over `reqwest`
//! - [`paths`] - endpoint URL construction from the configured server and prefix
//! - [`types`] - wire types (`Discussion`, `Page`, `UserSummary`, ...)
//! - [`error`] - `ApiError` taxonomy, including field-level validation errors

mod client;
mod error;
mod paths;
mod types;

pub use client::{ApiClient, Credentials};
pub use error::ApiError;
pub use paths::Endpoints;
pub use types::{
    Discussion, DiscussionPage, FeedScope, FileAttachment, NewDiscussion, Page, UserSummary,
    UserUpdate,
};
