use crate::api::{ApiClient, ApiError, FeedScope, FileAttachment, Page, UserSummary};
use crate::compose::Composer;
use crate::config::Config;
use crate::directory::UserDirectory;
use crate::feed::{ApiDiscussionSource, FeedController, FeedEvent, FeedUpdate};
use crate::presenter::DiscussionCard;
use crate::session::CurrentIdentity;
use chrono::Utc;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How long a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Focus and Mode
// ============================================================================

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Feed,
    Users,
}

/// Input mode on top of the browse layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    /// Typing a new discussion.
    Compose,
    /// Typing the path of a file to attach to the draft.
    AttachPath { input: String },
    Help,
}

// ============================================================================
// Events
// ============================================================================

/// Completions of background tasks other than feed fetches, which travel on
/// their own channel (see [`FeedEvent`]).
pub enum AppEvent {
    UsersLoaded {
        generation: u64,
        result: Result<Page<UserSummary>, String>,
    },
    UploadFinished {
        generation: u64,
        result: Result<FileAttachment, ApiError>,
    },
    SubmitFinished {
        result: Result<(), ApiError>,
    },
    /// A background task panicked.
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// App
// ============================================================================

/// Identity of the user running the client, fixed for the TUI's lifetime.
struct Viewer(Option<i64>);

impl CurrentIdentity for Viewer {
    fn user_id(&self) -> Option<i64> {
        self.0
    }
}

pub struct App {
    pub client: ApiClient,
    pub config: Config,
    /// Logged-in user, `None` when browsing anonymously.
    pub viewer: Option<UserSummary>,

    pub feed: FeedController<ApiDiscussionSource>,
    source: Arc<ApiDiscussionSource>,
    identity: Arc<dyn CurrentIdentity>,
    feed_tx: mpsc::Sender<FeedEvent>,

    pub users: UserDirectory,
    pub composer: Composer,

    pub focus: Focus,
    pub mode: Mode,
    /// Index of the highlighted discussion in the feed window.
    pub selected: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,
}

impl App {
    pub fn new(
        client: ApiClient,
        config: Config,
        viewer: Option<UserSummary>,
        scope: FeedScope,
        feed_tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let source = Arc::new(ApiDiscussionSource::new(
            client.clone(),
            config.feed_page_size,
        ));
        let identity: Arc<dyn CurrentIdentity> = Arc::new(Viewer(viewer.as_ref().map(|u| u.id)));
        let feed = FeedController::new(
            Arc::clone(&source),
            scope,
            Arc::clone(&identity),
            config.poll_interval(),
            feed_tx.clone(),
        );
        let users = UserDirectory::new(config.user_page_size);

        Self {
            client,
            config,
            viewer,
            feed,
            source,
            identity,
            feed_tx,
            users,
            composer: Composer::new(),
            focus: Focus::Feed,
            mode: Mode::Browse,
            selected: 0,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
        }
    }

    pub fn viewer_id(&self) -> Option<i64> {
        self.identity.user_id()
    }

    pub fn is_logged_in(&self) -> bool {
        self.viewer.is_some()
    }

    // ------------------------------------------------------------------------
    // Feed
    // ------------------------------------------------------------------------

    /// Replace the feed with one for `scope`. The old controller is torn down
    /// and any of its results still in flight are discarded.
    pub fn switch_scope(&mut self, scope: FeedScope) {
        if *self.feed.scope() == scope {
            return;
        }
        tracing::info!(scope = ?scope, "Switching feed");
        let mut feed = FeedController::new(
            Arc::clone(&self.source),
            scope,
            Arc::clone(&self.identity),
            self.config.poll_interval(),
            self.feed_tx.clone(),
        );
        feed.start();
        let mut old = std::mem::replace(&mut self.feed, feed);
        old.teardown();
        self.selected = 0;
        self.focus = Focus::Feed;
    }

    /// Apply a feed event and surface anything the user should hear about.
    ///
    /// The highlight stays on the same discussion when records are merged
    /// around it.
    pub fn handle_feed_event(&mut self, event: FeedEvent) {
        let selected_id = self.selected_id();
        match self.feed.handle_event(event) {
            FeedUpdate::Stale | FeedUpdate::Unchanged => return,
            FeedUpdate::Changed => {}
            FeedUpdate::Deleted(_) => self.set_status("Discussion deleted"),
            FeedUpdate::Failed(error) => self.set_status(format!("Error: {}", error)),
        }
        let position = selected_id.and_then(|id| {
            self.feed
                .state()
                .content()
                .iter()
                .position(|d| d.id == id)
        });
        if let Some(index) = position {
            self.selected = index;
        }
        self.clamp_selection();
        self.needs_redraw = true;
    }

    fn selected_id(&self) -> Option<i64> {
        self.feed.state().content().get(self.selected).map(|d| d.id)
    }

    pub fn selected_card(&self) -> Option<DiscussionCard> {
        let discussion = self.feed.state().content().get(self.selected)?;
        Some(DiscussionCard::new(
            discussion,
            self.viewer_id(),
            self.client.endpoints(),
            Utc::now(),
        ))
    }

    pub fn clamp_selection(&mut self) {
        let len = self.feed.state().content().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn nav_down(&mut self) {
        match self.focus {
            Focus::Feed => {
                if self.selected + 1 < self.feed.state().content().len() {
                    self.selected += 1;
                }
            }
            Focus::Users => self.users.select_next(),
        }
    }

    pub fn nav_up(&mut self) {
        match self.focus {
            Focus::Feed => self.selected = self.selected.saturating_sub(1),
            Focus::Users => self.users.select_previous(),
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Feed => Focus::Users,
            Focus::Users => Focus::Feed,
        };
    }

    // ------------------------------------------------------------------------
    // Status bar
    // ------------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired. Returns true if one was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}
