use crate::api::{ApiClient, ApiError, Discussion, DiscussionPage, FeedScope};
use std::future::Future;

/// Cursor-paginated access to one server's discussions.
///
/// The feed controller talks to the server only through this trait, so tests
/// can substitute a scripted source and count the calls it receives.
pub trait DiscussionSource: Send + Sync + 'static {
    /// First page of `scope`, newest first.
    fn first_page(
        &self,
        scope: &FeedScope,
    ) -> impl Future<Output = Result<DiscussionPage, ApiError>> + Send;

    /// One page strictly older than `cursor`.
    fn older_page(
        &self,
        scope: &FeedScope,
        cursor: i64,
    ) -> impl Future<Output = Result<DiscussionPage, ApiError>> + Send;

    /// Every record strictly newer than `cursor`, newest first.
    fn newer_records(
        &self,
        scope: &FeedScope,
        cursor: i64,
    ) -> impl Future<Output = Result<Vec<Discussion>, ApiError>> + Send;

    /// How many records are strictly newer than `cursor`.
    fn unseen_count(
        &self,
        scope: &FeedScope,
        cursor: i64,
    ) -> impl Future<Output = Result<u64, ApiError>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// [`DiscussionSource`] backed by the REST client.
#[derive(Debug, Clone)]
pub struct ApiDiscussionSource {
    client: ApiClient,
    page_size: u32,
}

impl ApiDiscussionSource {
    pub fn new(client: ApiClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl DiscussionSource for ApiDiscussionSource {
    async fn first_page(&self, scope: &FeedScope) -> Result<DiscussionPage, ApiError> {
        self.client.load_discussions(scope, self.page_size).await
    }

    async fn older_page(&self, scope: &FeedScope, cursor: i64) -> Result<DiscussionPage, ApiError> {
        self.client.load_older(scope, cursor, self.page_size).await
    }

    async fn newer_records(
        &self,
        scope: &FeedScope,
        cursor: i64,
    ) -> Result<Vec<Discussion>, ApiError> {
        self.client.load_newer(scope, cursor).await
    }

    async fn unseen_count(&self, scope: &FeedScope, cursor: i64) -> Result<u64, ApiError> {
        self.client.count_newer(scope, cursor).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete_discussion(id).await
    }
}
