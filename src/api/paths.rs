//! REST endpoint construction.
//!
//! Every URL the client requests is built here from the configured server URL
//! and API prefix. Path segments go through [`url::PathSegmentsMut`] so
//! usernames are always escaped.

use super::{ApiError, FeedScope};
use url::Url;

/// Sort order shared by every discussion query: newest first by id.
const SORT_NEWEST_FIRST: &str = "id,desc";

/// Resolved endpoint set for one server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    server: Url,
    api_base: Url,
}

impl Endpoints {
    /// Build endpoints from a server URL (`http://host:port`) and an API prefix
    /// (`/api/1.0`).
    pub fn new(server_url: &str, api_prefix: &str) -> Result<Self, ApiError> {
        let server =
            Url::parse(server_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{server_url}: {e}")))?;

        if server.cannot_be_a_base() || !matches!(server.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(server_url.to_string()));
        }

        let prefix: Vec<&str> = api_prefix.split('/').filter(|s| !s.is_empty()).collect();
        let api_base = join_segments(&server, &prefix);

        Ok(Self { server, api_base })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Whether HTTP Basic credentials may be sent to this server.
    ///
    /// HTTPS always qualifies; plain HTTP only for loopback hosts.
    pub fn allows_credentials(&self) -> bool {
        if self.server.scheme() == "https" {
            return true;
        }
        matches!(
            self.server.host_str(),
            Some("localhost") | Some("127.0.0.1") | Some("[::1]")
        )
    }

    pub fn login(&self) -> Url {
        self.api(&["login"])
    }

    pub fn users(&self) -> Url {
        self.api(&["users"])
    }

    /// `GET /users?page=&size=`
    pub fn user_list(&self, page: u32, size: u32) -> Url {
        let mut url = self.users();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string());
        url
    }

    pub fn user(&self, username: &str) -> Url {
        self.api(&["users", username])
    }

    pub fn user_by_id(&self, id: i64) -> Url {
        self.api(&["users", &id.to_string()])
    }

    pub fn discussions(&self) -> Url {
        self.api(&["discussions"])
    }

    pub fn discussion(&self, id: i64) -> Url {
        self.api(&["discussions", &id.to_string()])
    }

    pub fn upload(&self) -> Url {
        self.api(&["discussions", "upload"])
    }

    /// Public location of an uploaded attachment image.
    pub fn attachment_image(&self, name: &str) -> Url {
        join_segments(&self.server, &["images", "attachments", name])
    }

    /// `GET {scope}?page=0&size=N&sort=id,desc`
    pub fn first_page(&self, scope: &FeedScope, size: u32) -> Url {
        let mut url = self.scope_base(scope, None);
        url.query_pairs_mut()
            .append_pair("page", "0")
            .append_pair("size", &size.to_string())
            .append_pair("sort", SORT_NEWEST_FIRST);
        url
    }

    /// `GET {scope}/{cursor}?direction=before&page=0&size=N&sort=id,desc`
    pub fn older_than(&self, scope: &FeedScope, cursor: i64, size: u32) -> Url {
        let mut url = self.scope_base(scope, Some(cursor));
        url.query_pairs_mut()
            .append_pair("direction", "before")
            .append_pair("page", "0")
            .append_pair("size", &size.to_string())
            .append_pair("sort", SORT_NEWEST_FIRST);
        url
    }

    /// `GET {scope}/{cursor}?direction=after&sort=id,desc`
    pub fn newer_than(&self, scope: &FeedScope, cursor: i64) -> Url {
        let mut url = self.scope_base(scope, Some(cursor));
        url.query_pairs_mut()
            .append_pair("direction", "after")
            .append_pair("sort", SORT_NEWEST_FIRST);
        url
    }

    /// `GET {scope}/{cursor}?direction=after&count=true`
    pub fn newer_count(&self, scope: &FeedScope, cursor: i64) -> Url {
        let mut url = self.scope_base(scope, Some(cursor));
        url.query_pairs_mut()
            .append_pair("direction", "after")
            .append_pair("count", "true");
        url
    }

    fn scope_base(&self, scope: &FeedScope, cursor: Option<i64>) -> Url {
        let cursor = cursor.map(|c| c.to_string());
        let mut segments: Vec<&str> = match scope {
            FeedScope::Global => vec!["discussions"],
            FeedScope::User(name) => vec!["users", name, "discussions"],
        };
        if let Some(c) = cursor.as_deref() {
            segments.push(c);
        }
        self.api(&segments)
    }

    fn api(&self, segments: &[&str]) -> Url {
        join_segments(&self.api_base, segments)
    }
}

fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    // Checked in `Endpoints::new`: http(s) URLs can always be a base.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
