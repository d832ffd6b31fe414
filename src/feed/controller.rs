use super::deletion::{DeletionCoordinator, DeletionError};
use super::poller::{spawn_periodic, PollHandle};
use super::source::DiscussionSource;
use super::state::{FeedState, FeedView};
use crate::api::{Discussion, DiscussionPage, FeedScope};
use crate::session::CurrentIdentity;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one controller instance. Every event carries the id of the
/// controller that spawned it, so a replacement controller never applies a
/// predecessor's late results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u64);

impl ControllerId {
    fn next() -> Self {
        Self(NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feed#{}", self.0)
    }
}

/// Completion of a background fetch, or a poll timer tick.
///
/// Fetches are stamped with a per-controller ticket; only the completion whose
/// ticket matches the one outstanding for its kind is applied. Counts are also
/// stamped with the cursor they were computed against.
#[derive(Debug)]
pub enum FeedEvent {
    PollTick {
        controller: ControllerId,
    },
    InitialLoaded {
        controller: ControllerId,
        result: Result<DiscussionPage, String>,
    },
    CountLoaded {
        controller: ControllerId,
        ticket: u64,
        cursor: i64,
        result: Result<u64, String>,
    },
    OlderLoaded {
        controller: ControllerId,
        ticket: u64,
        result: Result<DiscussionPage, String>,
    },
    NewerLoaded {
        controller: ControllerId,
        ticket: u64,
        result: Result<Vec<Discussion>, String>,
    },
    DeleteFinished {
        controller: ControllerId,
        ticket: u64,
        result: Result<(), String>,
    },
}

impl FeedEvent {
    pub fn controller(&self) -> ControllerId {
        match self {
            FeedEvent::PollTick { controller }
            | FeedEvent::InitialLoaded { controller, .. }
            | FeedEvent::CountLoaded { controller, .. }
            | FeedEvent::OlderLoaded { controller, .. }
            | FeedEvent::NewerLoaded { controller, .. }
            | FeedEvent::DeleteFinished { controller, .. } => *controller,
        }
    }
}

/// What applying an event did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    /// The event belonged to another controller, a superseded fetch, or a
    /// torn-down feed, and was discarded.
    Stale,
    Unchanged,
    Changed,
    Deleted(i64),
    /// Initial load or delete failed; the message is for the user.
    Failed(String),
}

/// Keeps one feed's window fresh: first page, older pages, newer records,
/// the unseen-count poll and deletion.
///
/// All state lives here and is only mutated from [`handle_event`] and the
/// user-triggered operations, which the caller invokes from a single task.
/// Network work runs on spawned tasks that report back through `events`.
///
/// [`handle_event`]: FeedController::handle_event
pub struct FeedController<S: DiscussionSource> {
    id: ControllerId,
    scope: FeedScope,
    source: Arc<S>,
    identity: Arc<dyn CurrentIdentity>,
    poll_interval: Duration,
    events: mpsc::Sender<FeedEvent>,

    state: FeedState,
    deletion: DeletionCoordinator,
    poller: Option<PollHandle>,

    next_ticket: u64,
    older_ticket: Option<u64>,
    newer_ticket: Option<u64>,
    delete_ticket: Option<u64>,
    /// Counts stamped with a ticket below this are stale.
    count_floor: u64,

    started: bool,
    torn_down: bool,
}

impl<S: DiscussionSource> FeedController<S> {
    pub fn new(
        source: Arc<S>,
        scope: FeedScope,
        identity: Arc<dyn CurrentIdentity>,
        poll_interval: Duration,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let id = ControllerId::next();
        tracing::debug!(controller = %id, scope = ?scope, "Feed controller created");
        Self {
            id,
            scope,
            source,
            identity,
            poll_interval,
            events,
            state: FeedState::new(),
            deletion: DeletionCoordinator::new(),
            poller: None,
            next_ticket: 0,
            older_ticket: None,
            newer_ticket: None,
            delete_ticket: None,
            count_floor: 0,
            started: false,
            torn_down: false,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn view(&self) -> FeedView<'_> {
        self.state.view()
    }

    pub fn deletion(&self) -> &DeletionCoordinator {
        &self.deletion
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(PollHandle::is_active)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Fetch the first page. Only the first call does anything.
    pub fn start(&mut self) {
        if self.started || self.torn_down {
            return;
        }
        self.started = true;
        self.state.begin_initial();

        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        let controller = self.id;
        tracing::debug!(controller = %controller, "Loading first page");
        self.spawn("initial_load", async move {
            let result = source.first_page(&scope).await.map_err(|e| e.to_string());
            FeedEvent::InitialLoaded { controller, result }
        });
    }

    /// Ask the server how many records are newer than the current head.
    ///
    /// Runs silently: no loading flag, failures are only logged.
    pub fn poll_now(&mut self) {
        if self.torn_down {
            return;
        }
        let ticket = self.issue_ticket();
        let cursor = self.state.newest_cursor();

        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        let controller = self.id;
        self.spawn("unseen_count", async move {
            let result = source
                .unseen_count(&scope, cursor)
                .await
                .map_err(|e| e.to_string());
            FeedEvent::CountLoaded {
                controller,
                ticket,
                cursor,
                result,
            }
        });
    }

    /// Fetch the page after the oldest record. Returns `false` when nothing
    /// was issued (empty window, or a load-older already in flight).
    pub fn load_older(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        let Some(cursor) = self.state.begin_older() else {
            return false;
        };
        let ticket = self.issue_ticket();
        self.older_ticket = Some(ticket);

        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        let controller = self.id;
        tracing::debug!(controller = %controller, cursor, "Loading older page");
        self.spawn("load_older", async move {
            let result = source
                .older_page(&scope, cursor)
                .await
                .map_err(|e| e.to_string());
            FeedEvent::OlderLoaded {
                controller,
                ticket,
                result,
            }
        });
        true
    }

    /// Fetch every record newer than the head. Returns `false` when a
    /// load-newer is already in flight.
    pub fn load_newer(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        let Some(cursor) = self.state.begin_newer() else {
            return false;
        };
        let ticket = self.issue_ticket();
        self.newer_ticket = Some(ticket);

        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        let controller = self.id;
        tracing::debug!(controller = %controller, cursor, "Loading newer records");
        self.spawn("load_newer", async move {
            let result = source
                .newer_records(&scope, cursor)
                .await
                .map_err(|e| e.to_string());
            FeedEvent::NewerLoaded {
                controller,
                ticket,
                result,
            }
        });
        true
    }

    #[cfg(test)]
    pub(crate) fn pending_newer_ticket(&self) -> Option<u64> {
        self.newer_ticket
    }

    /// Begin the confirm-then-delete flow for a record in the window.
    pub fn request_delete(&mut self, id: i64) -> Result<(), DeletionError> {
        if self.torn_down {
            return Err(DeletionError::FeedClosed);
        }
        let target = self
            .state
            .get(id)
            .cloned()
            .ok_or(DeletionError::NotFound(id))?;
        self.deletion.request(&target, self.identity.user_id())
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.deletion.cancel()
    }

    /// Confirm the pending deletion and send the delete request.
    pub fn confirm_delete(&mut self) -> Result<(), DeletionError> {
        if self.torn_down {
            return Err(DeletionError::NothingToConfirm);
        }
        let id = self.deletion.confirm()?;
        let ticket = self.issue_ticket();
        self.delete_ticket = Some(ticket);

        let source = Arc::clone(&self.source);
        let controller = self.id;
        tracing::info!(controller = %controller, discussion_id = id, "Deleting discussion");
        self.spawn("delete", async move {
            let result = source.delete(id).await.map_err(|e| e.to_string());
            FeedEvent::DeleteFinished {
                controller,
                ticket,
                result,
            }
        });
        Ok(())
    }

    /// Stop polling and refuse every later event. Fetches already in flight
    /// still complete, but their results are discarded.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
        self.older_ticket = None;
        self.newer_ticket = None;
        self.delete_ticket = None;
        tracing::debug!(controller = %self.id, "Feed controller torn down");
    }

    // ------------------------------------------------------------------------
    // Event handling
    // ------------------------------------------------------------------------

    /// Apply a completion or timer tick.
    pub fn handle_event(&mut self, event: FeedEvent) -> FeedUpdate {
        if event.controller() != self.id || self.torn_down {
            tracing::trace!(controller = %self.id, from = %event.controller(), "Discarding foreign feed event");
            return FeedUpdate::Stale;
        }

        match event {
            FeedEvent::PollTick { .. } => {
                if self.poller.is_none() {
                    return FeedUpdate::Stale;
                }
                self.poll_now();
                FeedUpdate::Unchanged
            }

            FeedEvent::InitialLoaded { result, .. } => {
                if !self.state.is_loading_initial() {
                    return FeedUpdate::Stale;
                }
                match result {
                    Ok(page) => {
                        tracing::info!(
                            controller = %self.id,
                            count = page.content.len(),
                            last = page.last,
                            "First page loaded"
                        );
                        self.state.finish_initial(Ok(page));
                        self.start_polling();
                        FeedUpdate::Changed
                    }
                    Err(error) => {
                        tracing::warn!(controller = %self.id, error = %error, "First page failed");
                        self.state.finish_initial(Err(error.clone()));
                        FeedUpdate::Failed(error)
                    }
                }
            }

            FeedEvent::CountLoaded {
                ticket,
                cursor,
                result,
                ..
            } => {
                if ticket < self.count_floor || cursor != self.state.newest_cursor() {
                    tracing::trace!(ticket, cursor, "Discarding stale unseen count");
                    return FeedUpdate::Stale;
                }
                match result {
                    Ok(count) => {
                        self.count_floor = ticket + 1;
                        if count == self.state.unseen_count() {
                            return FeedUpdate::Unchanged;
                        }
                        self.state.set_unseen_count(count);
                        FeedUpdate::Changed
                    }
                    Err(error) => {
                        tracing::debug!(controller = %self.id, error = %error, "Unseen count poll failed");
                        FeedUpdate::Unchanged
                    }
                }
            }

            FeedEvent::OlderLoaded { ticket, result, .. } => {
                if self.older_ticket != Some(ticket) {
                    return FeedUpdate::Stale;
                }
                self.older_ticket = None;
                match result {
                    Ok(page) => {
                        let added = self.state.finish_older(Some(page));
                        tracing::debug!(controller = %self.id, added, "Older page merged");
                        FeedUpdate::Changed
                    }
                    Err(error) => {
                        tracing::debug!(controller = %self.id, error = %error, "Older page failed");
                        self.state.finish_older(None);
                        FeedUpdate::Changed
                    }
                }
            }

            FeedEvent::NewerLoaded { ticket, result, .. } => {
                if self.newer_ticket != Some(ticket) {
                    return FeedUpdate::Stale;
                }
                self.newer_ticket = None;
                match result {
                    Ok(records) => {
                        let added = self.state.finish_newer(Some(records));
                        // Counts computed against the old head are meaningless now.
                        self.count_floor = self.next_ticket;
                        tracing::debug!(controller = %self.id, added, "Newer records merged");
                        FeedUpdate::Changed
                    }
                    Err(error) => {
                        tracing::debug!(controller = %self.id, error = %error, "Newer records failed");
                        self.state.finish_newer(None);
                        FeedUpdate::Changed
                    }
                }
            }

            FeedEvent::DeleteFinished { ticket, result, .. } => {
                if self.delete_ticket != Some(ticket) {
                    return FeedUpdate::Stale;
                }
                self.delete_ticket = None;
                let error = result.as_ref().err().cloned();
                match (self.deletion.complete(result), error) {
                    (Some(id), _) => {
                        let removed = self.state.remove(id);
                        tracing::info!(controller = %self.id, discussion_id = id, removed, "Discussion deleted");
                        FeedUpdate::Deleted(id)
                    }
                    (None, Some(error)) => {
                        tracing::warn!(controller = %self.id, error = %error, "Delete failed");
                        FeedUpdate::Failed(error)
                    }
                    (None, None) => FeedUpdate::Stale,
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        ticket
    }

    fn start_polling(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let tx = self.events.clone();
        let controller = self.id;
        self.poller = Some(spawn_periodic(self.poll_interval, move || {
            match tx.try_send(FeedEvent::PollTick { controller }) {
                Ok(()) => true,
                // A tick is only a nudge; skipping one under backpressure is fine.
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Closed(_)) => false,
            }
        }));
        tracing::debug!(controller = %controller, interval = ?self.poll_interval, "Unseen count polling started");
    }

    fn spawn<F>(&self, task: &'static str, work: F)
    where
        F: Future<Output = FeedEvent> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let event = work.await;
            if let Err(e) = tx.send(event).await {
                tracing::debug!(task, error = %e, "Dropping feed result (receiver gone)");
            }
        });
    }
}

impl<S: DiscussionSource> Drop for FeedController<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
