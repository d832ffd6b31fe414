//! Helper functions for UI operations.
//!
//! Spawning of background requests that are not feed fetches (those belong to
//! the feed controller), plus panic capture for spawned tasks.

use crate::app::{App, AppEvent};
use crate::compose::read_upload;
use crate::directory::DirectoryRequest;
use crate::util::validate_url_for_open;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// A panicking background task would otherwise vanish silently; this turns
/// the panic payload into `Err(String)` so it can be reported as
/// [`AppEvent::TaskPanicked`].
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Run `future` on a task and send its event, or a `TaskPanicked` if it panics.
fn spawn_app_task<F>(task: &'static str, event_tx: &mpsc::Sender<AppEvent>, future: F)
where
    F: std::future::Future<Output = AppEvent> + Send + 'static,
{
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(future).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, error = %error, "Background task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if tx.send(event).await.is_err() {
            tracing::debug!(task, "Event receiver dropped");
        }
    });
}

/// Fetch one page of the user directory.
pub(super) fn spawn_user_page(
    app: &App,
    request: DirectoryRequest,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let client = app.client.clone();
    tracing::debug!(page = request.page, generation = request.generation, "Loading users");
    spawn_app_task("list_users", event_tx, async move {
        let result = client
            .list_users(request.page, request.size)
            .await
            .map_err(|e| e.to_string());
        AppEvent::UsersLoaded {
            generation: request.generation,
            result,
        }
    });
}

/// Read a local file and upload it as the draft's attachment.
pub(super) fn spawn_upload(app: &mut App, path: PathBuf, event_tx: &mpsc::Sender<AppEvent>) {
    let (name, bytes) = match read_upload(&path) {
        Ok(file) => file,
        Err(e) => {
            app.set_status(format!("Error: {}", e));
            return;
        }
    };
    let Some(generation) = app.composer.begin_upload() else {
        app.set_status("Busy, try again in a moment");
        return;
    };
    let client = app.client.clone();
    spawn_app_task("upload_attachment", event_tx, async move {
        let result = client.upload_attachment(&name, bytes).await;
        AppEvent::UploadFinished { generation, result }
    });
}

/// Post the current draft.
pub(super) fn spawn_submit(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(body) = app.composer.begin_submit() else {
        return;
    };
    let client = app.client.clone();
    spawn_app_task("post_discussion", event_tx, async move {
        let result = client.post_discussion(&body).await;
        AppEvent::SubmitFinished { result }
    });
}

/// Open the selected discussion's image attachment in the system viewer.
pub(super) fn open_selected_attachment(app: &mut App) {
    let Some(card) = app.selected_card() else {
        return;
    };
    let Some(url) = card.image_url else {
        app.set_status("No image attachment");
        return;
    };
    if let Err(e) = validate_url_for_open(url.as_str(), app.client.endpoints().server()) {
        tracing::warn!(url = %url, error = %e, "Refusing to open attachment");
        app.set_status(format!("Error: {}", e));
        return;
    }
    match open::that(url.as_str()) {
        Ok(()) => app.set_status("Opened attachment"),
        Err(e) => app.set_status(format!("Failed to open: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result = catch_task_panic(async {
            panic!("boom");
        })
        .await;
        let err: Result<(), String> = result;
        assert_eq!(err, Err("boom".to_string()));
    }
}
