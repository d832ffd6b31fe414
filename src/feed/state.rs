use crate::api::{Discussion, DiscussionPage};
use std::collections::HashSet;

/// The materialized window of a feed plus its in-flight flags.
///
/// Every mutation goes through a `begin_*` / `finish_*` pair so the flags and
/// the window can never disagree. Re-entrant `begin_*` calls return `None`.
#[derive(Debug, Clone)]
pub struct FeedState {
    content: Vec<Discussion>,
    is_last_page: bool,
    page_number: u32,
    page_size: u32,
    unseen_count: u64,
    loading_initial: bool,
    loading_older: bool,
    loading_newer: bool,
    initial_error: Option<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
            // Nothing fetched yet, so nothing to "load more" of.
            is_last_page: true,
            page_number: 0,
            page_size: 0,
            unseen_count: 0,
            loading_initial: false,
            loading_older: false,
            loading_newer: false,
            initial_error: None,
        }
    }

    pub fn content(&self) -> &[Discussion] {
        &self.content
    }

    pub fn get(&self, id: i64) -> Option<&Discussion> {
        self.content.iter().find(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_last_page(&self) -> bool {
        self.is_last_page
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn unseen_count(&self) -> u64 {
        self.unseen_count
    }

    pub fn is_loading_initial(&self) -> bool {
        self.loading_initial
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn is_loading_newer(&self) -> bool {
        self.loading_newer
    }

    pub fn initial_error(&self) -> Option<&str> {
        self.initial_error.as_deref()
    }

    /// Cursor for "newer than": id of the newest record, or 0 for an empty window.
    pub fn newest_cursor(&self) -> i64 {
        self.content.first().map(|d| d.id).unwrap_or(0)
    }

    /// Cursor for "older than": id of the oldest record, if any.
    pub fn oldest_cursor(&self) -> Option<i64> {
        self.content.last().map(|d| d.id)
    }

    // ------------------------------------------------------------------------
    // Initial load
    // ------------------------------------------------------------------------

    pub fn begin_initial(&mut self) {
        self.loading_initial = true;
        self.initial_error = None;
    }

    /// Replace the window with the first page, or record why it failed.
    pub fn finish_initial(&mut self, result: Result<DiscussionPage, String>) {
        self.loading_initial = false;
        match result {
            Ok(page) => {
                self.is_last_page = page.last;
                self.page_number = page.number;
                self.page_size = page.size;
                self.content = page.content;
            }
            Err(error) => self.initial_error = Some(error),
        }
    }

    // ------------------------------------------------------------------------
    // Older pages
    // ------------------------------------------------------------------------

    /// Start a load-older fetch. Returns the cursor, or `None` when the window
    /// is empty or a load-older fetch is already in flight.
    pub fn begin_older(&mut self) -> Option<i64> {
        if self.loading_older {
            return None;
        }
        let cursor = self.oldest_cursor()?;
        self.loading_older = true;
        Some(cursor)
    }

    /// Finish a load-older fetch. `None` means it failed: only the flag is
    /// cleared. Returns the number of records appended.
    pub fn finish_older(&mut self, page: Option<DiscussionPage>) -> usize {
        self.loading_older = false;
        let Some(page) = page else {
            return 0;
        };

        self.is_last_page = page.last;
        self.page_number = page.number;
        let mut known: HashSet<i64> = self.content.iter().map(|d| d.id).collect();
        let before = self.content.len();
        self.content
            .extend(page.content.into_iter().filter(|d| known.insert(d.id)));
        self.content.len() - before
    }

    // ------------------------------------------------------------------------
    // Newer records
    // ------------------------------------------------------------------------

    /// Start a load-newer fetch. Returns the cursor (0 for an empty window),
    /// or `None` when a load-newer fetch is already in flight.
    pub fn begin_newer(&mut self) -> Option<i64> {
        if self.loading_newer {
            return None;
        }
        self.loading_newer = true;
        Some(self.newest_cursor())
    }

    /// Finish a load-newer fetch. On success the records are prepended in the
    /// order returned and the unseen count drops to zero; on failure (`None`)
    /// the unseen count is left alone so the banner comes back.
    pub fn finish_newer(&mut self, records: Option<Vec<Discussion>>) -> usize {
        self.loading_newer = false;
        let Some(records) = records else {
            return 0;
        };

        let mut known: HashSet<i64> = self.content.iter().map(|d| d.id).collect();
        let mut merged: Vec<Discussion> = records
            .into_iter()
            .filter(|d| known.insert(d.id))
            .collect();
        let added = merged.len();
        merged.append(&mut self.content);
        self.content = merged;
        self.unseen_count = 0;
        added
    }

    // ------------------------------------------------------------------------
    // Count and removal
    // ------------------------------------------------------------------------

    pub fn set_unseen_count(&mut self, count: u64) {
        self.unseen_count = count;
    }

    /// Remove a record by id. Absent ids are a silent no-op.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.content.len();
        self.content.retain(|d| d.id != id);
        self.content.len() != before
    }

    // ------------------------------------------------------------------------
    // Display derivation
    // ------------------------------------------------------------------------

    /// What the feed should show, derived purely from the current state.
    pub fn view(&self) -> FeedView<'_> {
        if self.loading_initial {
            return FeedView::Loading;
        }
        if self.content.is_empty() && self.unseen_count == 0 {
            return FeedView::Empty;
        }

        let banner = match (self.unseen_count, self.loading_newer) {
            (0, _) => None,
            (_, true) => Some(Banner::Loading),
            (count, false) => Some(Banner::Unseen(count)),
        };

        let load_more = match (self.is_last_page, self.loading_older) {
            (true, _) => LoadMore::Hidden,
            (false, true) => LoadMore::Loading,
            (false, false) => LoadMore::Available,
        };

        FeedView::Items {
            banner,
            items: &self.content,
            load_more,
        }
    }
}

/// Rendering decision for a whole feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedView<'a> {
    /// First page still loading.
    Loading,
    /// Nothing materialized and nothing new on the server.
    Empty,
    Items {
        banner: Option<Banner>,
        items: &'a [Discussion],
        load_more: LoadMore,
    },
}

/// The "new discussions" banner above the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Unseen(u64),
    /// A load-newer fetch is in flight; shown as a spinner.
    Loading,
}

/// The "load more" affordance below the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    Available,
    Loading,
    Hidden,
}

/// Banner wording for an unseen count.
pub fn unseen_message(count: u64) -> String {
    if count == 1 {
        "There is 1 new discussion".to_string()
    } else {
        format!("There are {} new discussions", count)
    }
}

pub const EMPTY_FEED_MESSAGE: &str = "There are no discussions";
