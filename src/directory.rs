//! Paged list of forum users.
use crate::api::{Page, UserSummary};
use crate::util::one_line;

/// Error text shown whenever a page fails to load.
pub const USER_LOAD_FAILED: &str = "User load failed";

/// A page fetch the caller should perform and report back with
/// [`UserDirectory::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryRequest {
    pub generation: u64,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    page: Page<UserSummary>,
    page_size: u32,
    loading: bool,
    error: Option<String>,
    generation: u64,
    selected: usize,
}

impl UserDirectory {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: Page::default(),
            page_size,
            loading: false,
            error: None,
            generation: 0,
            selected: 0,
        }
    }

    pub fn page(&self) -> &Page<UserSummary> {
        &self.page
    }

    pub fn users(&self) -> &[UserSummary] {
        &self.page.content
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_next(&self) -> bool {
        !self.page.last
    }

    pub fn has_previous(&self) -> bool {
        !self.page.first
    }

    /// Rows as displayed: `displayName@username`.
    pub fn labels(&self) -> Vec<String> {
        self.page.content.iter().map(|u| one_line(&u.label())).collect()
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    pub fn begin_initial(&mut self) -> DirectoryRequest {
        self.request(0)
    }

    /// `None` when already on the last page.
    pub fn begin_next(&mut self) -> Option<DirectoryRequest> {
        if !self.has_next() {
            return None;
        }
        Some(self.request(self.page.number.saturating_add(1)))
    }

    /// `None` when already on the first page.
    pub fn begin_previous(&mut self) -> Option<DirectoryRequest> {
        if !self.has_previous() {
            return None;
        }
        Some(self.request(self.page.number.saturating_sub(1)))
    }

    fn request(&mut self, page: u32) -> DirectoryRequest {
        self.generation = self.generation.wrapping_add(1);
        self.loading = true;
        DirectoryRequest {
            generation: self.generation,
            page,
            size: self.page_size,
        }
    }

    /// Apply a page result. Results for a superseded request are ignored and
    /// `false` is returned.
    pub fn finish<E: std::fmt::Display>(
        &mut self,
        generation: u64,
        result: Result<Page<UserSummary>, E>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "Discarding stale user page");
            return false;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.page = page;
                self.error = None;
                self.selected = self.selected.min(self.page.content.len().saturating_sub(1));
            }
            Err(e) => {
                tracing::warn!(error = %e, "User page failed to load");
                self.error = Some(USER_LOAD_FAILED.to_string());
            }
        }
        true
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_user(&self) -> Option<&UserSummary> {
        self.page.content.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.page.content.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}
