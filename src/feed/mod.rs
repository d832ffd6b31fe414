//! Live discussion feed.
//!
//! A feed is a window of discussions, newest first, kept fresh by cursor
//! pagination in both directions plus a background poll for the number of
//! unseen records:
//!
//! - [`state`] holds the window and derives what to display
//! - [`source`] is the cursor-paginated server contract
//! - [`controller`] owns one window, spawns fetches and applies their results
//! - [`poller`] is the cancellable timer behind the unseen-count poll
//! - [`deletion`] is the confirm-then-delete state machine
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut rx) = mpsc::channel(64);
//! let source = Arc::new(ApiDiscussionSource::new(client, 5));
//! let mut feed = FeedController::new(source, FeedScope::Global, identity, Duration::from_secs(3), tx);
//! feed.start();
//! while let Some(event) = rx.recv().await {
//!     feed.handle_event(event);
//! }
//! ```

pub mod controller;
pub mod deletion;
pub mod poller;
pub mod source;
pub mod state;

pub use crate::api::FeedScope;
pub use controller::{ControllerId, FeedController, FeedEvent, FeedUpdate};
pub use deletion::{DeletionCoordinator, DeletionError, DeletionState};
pub use poller::{spawn_periodic, PollHandle};
pub use source::{ApiDiscussionSource, DiscussionSource};
pub use state::{unseen_message, Banner, FeedState, FeedView, LoadMore, EMPTY_FEED_MESSAGE};
