//! Integration tests for feed synchronization against a mocked forum server.
//!
//! Each test starts its own `wiremock` server and drives a `FeedController`
//! backed by the real `ApiClient`, applying completions the way the TUI loop
//! does: receive a `FeedEvent`, hand it to `handle_event`.

use parley::api::{ApiClient, FeedScope};
use parley::feed::{
    ApiDiscussionSource, Banner, DeletionState, FeedController, FeedEvent, FeedUpdate, FeedView,
    LoadMore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREFIX: &str = "/api/1.0";

fn discussion(id: i64, user_id: i64) -> Value {
    json!({
        "id": id,
        "content": format!("discussion {id}"),
        "date": 1561294668539i64,
        "user": {
            "id": user_id,
            "username": format!("user{user_id}"),
            "displayName": format!("display{user_id}"),
            "image": null
        }
    })
}

fn page(ids: &[i64], last: bool) -> Value {
    json!({
        "content": ids.iter().map(|&id| discussion(id, 1)).collect::<Vec<_>>(),
        "number": 0,
        "size": 5,
        "first": true,
        "last": last,
        "totalPages": 1
    })
}

struct Feed {
    controller: FeedController<ApiDiscussionSource>,
    rx: mpsc::Receiver<FeedEvent>,
}

impl Feed {
    fn new(server: &MockServer, scope: FeedScope, viewer: Option<i64>) -> Self {
        let client = ApiClient::new(&server.uri(), PREFIX, Duration::from_secs(5)).unwrap();
        let source = Arc::new(ApiDiscussionSource::new(client, 5));
        let (tx, rx) = mpsc::channel(32);
        // Long interval: tests trigger polls explicitly with `poll_now`.
        let controller = FeedController::new(
            source,
            scope,
            Arc::new(move || viewer),
            Duration::from_secs(3600),
            tx,
        );
        Self { controller, rx }
    }

    /// Wait for the next completion and apply it.
    async fn apply_next(&mut self) -> FeedUpdate {
        let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for feed event")
            .expect("feed channel closed");
        self.controller.handle_event(event)
    }

    fn ids(&self) -> Vec<i64> {
        self.controller
            .state()
            .content()
            .iter()
            .map(|d| d.id)
            .collect()
    }
}

async fn mount_first_page(server: &MockServer, feed_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(feed_path))
        .and(query_param("page", "0"))
        .and(query_param("size", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_window_lifecycle() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        "/api/1.0/discussions",
        page(&[10, 9, 8, 7, 6], false),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/discussions/10"))
        .and(query_param("direction", "after"))
        .and(query_param("count", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 2})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/discussions/10"))
        .and(query_param("direction", "after"))
        .and(query_param("sort", "id,desc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([discussion(12, 1), discussion(11, 2)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/discussions/6"))
        .and(query_param("direction", "before"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&[5, 4, 3, 2, 1], true)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/1.0/discussions/12"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut feed = Feed::new(&server, FeedScope::Global, Some(1));

    // First page
    feed.controller.start();
    assert_eq!(feed.controller.view(), FeedView::Loading);
    assert_eq!(feed.apply_next().await, FeedUpdate::Changed);
    assert_eq!(feed.ids(), vec![10, 9, 8, 7, 6]);
    assert!(feed.controller.is_polling());

    // Unseen count
    feed.controller.poll_now();
    assert_eq!(feed.apply_next().await, FeedUpdate::Changed);
    match feed.controller.view() {
        FeedView::Items { banner, .. } => assert_eq!(banner, Some(Banner::Unseen(2))),
        other => panic!("unexpected view {other:?}"),
    }

    // Newer records replace the banner
    assert!(feed.controller.load_newer());
    assert_eq!(feed.apply_next().await, FeedUpdate::Changed);
    assert_eq!(feed.ids(), vec![12, 11, 10, 9, 8, 7, 6]);
    assert_eq!(feed.controller.state().unseen_count(), 0);

    // Older page reaches the end
    assert!(feed.controller.load_older());
    assert_eq!(feed.apply_next().await, FeedUpdate::Changed);
    assert_eq!(feed.ids(), vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    match feed.controller.view() {
        FeedView::Items { load_more, .. } => assert_eq!(load_more, LoadMore::Hidden),
        other => panic!("unexpected view {other:?}"),
    }

    // Delete own record
    feed.controller.request_delete(12).unwrap();
    feed.controller.confirm_delete().unwrap();
    assert_eq!(feed.apply_next().await, FeedUpdate::Deleted(12));
    assert_eq!(feed.ids()[0], 11);
    assert_eq!(*feed.controller.deletion().state(), DeletionState::Idle);

    feed.controller.teardown();
    assert!(!feed.controller.is_polling());
}

#[tokio::test]
async fn test_user_scoped_feed_uses_user_path() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        "/api/1.0/users/user1/discussions",
        page(&[3, 2, 1], true),
    )
    .await;

    let mut feed = Feed::new(&server, FeedScope::User("user1".into()), None);
    feed.controller.start();
    assert_eq!(feed.apply_next().await, FeedUpdate::Changed);
    assert_eq!(feed.ids(), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_initial_failure_leaves_empty_feed_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/discussions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut feed = Feed::new(&server, FeedScope::Global, None);
    feed.controller.start();
    assert!(matches!(feed.apply_next().await, FeedUpdate::Failed(_)));
    assert_eq!(feed.controller.view(), FeedView::Empty);
    assert!(feed.controller.state().initial_error().is_some());
    assert!(!feed.controller.is_polling());
}

#[tokio::test]
async fn test_empty_feed_polls_from_cursor_zero() {
    let server = MockServer::start().await;
    mount_first_page(&server, "/api/1.0/discussions", page(&[], true)).await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/discussions/0"))
        .and(query_param("count", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = Feed::new(&server, FeedScope::Global, None);
    feed.controller.start();
    feed.apply_next().await;
    assert_eq!(feed.controller.view(), FeedView::Empty);

    feed.controller.poll_now();
    feed.apply_next().await;
    assert_eq!(feed.controller.state().unseen_count(), 1);
    assert!(matches!(feed.controller.view(), FeedView::Items { .. }));
}

#[tokio::test]
async fn test_failed_delete_returns_to_confirmation() {
    let server = MockServer::start().await;
    mount_first_page(&server, "/api/1.0/discussions", page(&[10], true)).await;
    Mock::given(method("DELETE"))
        .and(path("/api/1.0/discussions/10"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut feed = Feed::new(&server, FeedScope::Global, Some(1));
    feed.controller.start();
    feed.apply_next().await;

    feed.controller.request_delete(10).unwrap();
    feed.controller.confirm_delete().unwrap();
    assert!(matches!(feed.apply_next().await, FeedUpdate::Failed(_)));
    assert_eq!(feed.ids(), vec![10]);
    assert!(matches!(
        feed.controller.deletion().state(),
        DeletionState::Confirming { error: Some(_), .. }
    ));
}

#[tokio::test]
async fn test_older_failure_is_silent_and_retryable() {
    let server = MockServer::start().await;
    mount_first_page(&server, "/api/1.0/discussions", page(&[10, 9], false)).await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/discussions/9"))
        .and(query_param("direction", "before"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut feed = Feed::new(&server, FeedScope::Global, None);
    feed.controller.start();
    feed.apply_next().await;

    assert!(feed.controller.load_older());
    assert_eq!(feed.apply_next().await, FeedUpdate::Changed);
    assert_eq!(feed.ids(), vec![10, 9]);
    assert!(!feed.controller.state().is_loading_older());
    assert!(feed.controller.load_older());
}
