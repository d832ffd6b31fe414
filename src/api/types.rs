use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Users
// ============================================================================

/// Public view of a forum user, as returned by the users and login endpoints
/// and embedded as the author of every discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    /// Stored profile image file name, if the user uploaded one.
    #[serde(default)]
    pub image: Option<String>,
}

impl UserSummary {
    /// `displayName@username`, the way users are listed everywhere.
    pub fn label(&self) -> String {
        format!("{}@{}", self.display_name, self.username)
    }
}

/// Body of `PUT /users/{id}`.
///
/// `image` carries raw base64 (no `data:` prefix) and is omitted entirely when
/// the image is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Body of `POST /users`. Borrowed so the password never needs to be copied
/// out of its secret wrapper for longer than the request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupRequest<'a> {
    pub username: &'a str,
    pub display_name: &'a str,
    pub password: &'a str,
}

// ============================================================================
// Discussions
// ============================================================================

/// File uploaded ahead of a discussion and linked to it on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(default)]
    pub id: i64,
    /// Upload time in epoch milliseconds.
    #[serde(default)]
    pub date: Option<i64>,
    pub name: String,
    /// MIME type as detected by the server (e.g. `image/png`).
    #[serde(default)]
    pub file_type: String,
}

impl FileAttachment {
    pub fn is_image(&self) -> bool {
        self.file_type.starts_with("image")
    }
}

/// A single discussion record. Ids are assigned by the server and increase
/// monotonically, which is what makes them usable as pagination cursors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: i64,
    pub content: String,
    /// Creation time in epoch milliseconds.
    pub date: i64,
    pub user: UserSummary,
    #[serde(default)]
    pub attachment: Option<FileAttachment>,
}

/// Body of `POST /discussions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDiscussion {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<FileAttachment>,
}

// ============================================================================
// Envelopes
// ============================================================================

fn default_true() -> bool {
    true
}

/// Spring-style page envelope: `{content, number, size, first, last, totalPages}`.
///
/// `first` and `last` default to `true` when absent so a bare `{content: []}`
/// never offers a "load more" affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default = "default_true")]
    pub first: bool,
    #[serde(default = "default_true")]
    pub last: bool,
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            number: 0,
            size: 0,
            first: true,
            last: true,
            total_pages: 0,
        }
    }
}

pub type DiscussionPage = Page<Discussion>;

/// `{count: n}` returned by the count-only newer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

/// Error envelope produced by the server for every non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub validation_errors: BTreeMap<String, String>,
}

// ============================================================================
// Scope
// ============================================================================

/// Which discussion collection a feed reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FeedScope {
    /// Every discussion on the server.
    #[default]
    Global,
    /// Only discussions authored by the named user.
    User(String),
}

impl FeedScope {
    pub fn from_username(username: Option<String>) -> Self {
        match username {
            Some(name) if !name.is_empty() => FeedScope::User(name),
            _ => FeedScope::Global,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            FeedScope::Global => None,
            FeedScope::User(name) => Some(name),
        }
    }
}
