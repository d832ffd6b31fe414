//! Application event handling.
//!
//! Applies completions of the user-directory, upload and submit tasks. Feed
//! completions go straight to [`App::handle_feed_event`].

use crate::app::{App, AppEvent, Mode};
use crate::directory::USER_LOAD_FAILED;

pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::UsersLoaded { generation, result } => {
            let failed = result.is_err();
            if app.users.finish(generation, result) && failed {
                app.set_status(USER_LOAD_FAILED);
            }
        }

        AppEvent::UploadFinished { generation, result } => {
            if !app.composer.finish_upload(generation, result) {
                return;
            }
            match (app.composer.attachment(), app.composer.error()) {
                (_, Some(error)) => {
                    let msg = format!("Upload failed: {}", error);
                    app.set_status(msg);
                }
                (Some(attachment), None) => {
                    let msg = format!("Attached {}", attachment.name);
                    app.set_status(msg);
                }
                (None, None) => {}
            }
        }

        AppEvent::SubmitFinished { result } => {
            if app.composer.finish_submit(result) {
                app.mode = Mode::Browse;
                app.set_status("Discussion posted");
                // Surface the new record through the unseen banner.
                app.feed.poll_now();
            } else if let Some(error) = app.composer.error() {
                let msg = format!("Error: {}", error);
                app.set_status(msg);
            }
        }

        AppEvent::TaskPanicked { task, error } => {
            app.set_status(format!("Internal error in {}: {}", task, error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiError, FeedScope, FileAttachment, Page, UserSummary};
    use crate::config::Config;
    use std::collections::BTreeMap;
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let config = Config::default();
        let client = ApiClient::new(
            &config.server_url,
            &config.api_prefix,
            config.request_timeout(),
        )
        .unwrap();
        let (tx, _rx) = mpsc::channel(16);
        App::new(client, config, None, FeedScope::Global, tx)
    }

    #[tokio::test]
    async fn test_user_load_failure_reported() {
        let mut app = test_app();
        let request = app.users.begin_initial();
        handle_app_event(
            &mut app,
            AppEvent::UsersLoaded {
                generation: request.generation,
                result: Err("HTTP error: status 500".into()),
            },
        );
        assert_eq!(app.users.error(), Some(USER_LOAD_FAILED));
        assert_eq!(
            app.status_message.as_ref().map(|(m, _)| &**m),
            Some(USER_LOAD_FAILED)
        );
    }

    #[tokio::test]
    async fn test_users_loaded() {
        let mut app = test_app();
        let request = app.users.begin_initial();
        let page = Page {
            content: vec![UserSummary {
                id: 1,
                username: "user1".into(),
                display_name: "display1".into(),
                image: None,
            }],
            ..Page::default()
        };
        handle_app_event(
            &mut app,
            AppEvent::UsersLoaded {
                generation: request.generation,
                result: Ok(page),
            },
        );
        assert_eq!(app.users.labels(), vec!["display1@user1"]);
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_upload_finished_attaches() {
        let mut app = test_app();
        let generation = app.composer.begin_upload().unwrap();
        handle_app_event(
            &mut app,
            AppEvent::UploadFinished {
                generation,
                result: Ok(FileAttachment {
                    id: 4,
                    date: None,
                    name: "f00d.png".into(),
                    file_type: "image/png".into(),
                }),
            },
        );
        assert_eq!(app.composer.attachment().map(|a| a.id), Some(4));
    }

    #[tokio::test]
    async fn test_upload_after_cancelled_draft_is_ignored() {
        let mut app = test_app();
        app.mode = Mode::Compose;
        let generation = app.composer.begin_upload().unwrap();
        app.composer.cancel();
        app.mode = Mode::Browse;

        handle_app_event(
            &mut app,
            AppEvent::UploadFinished {
                generation,
                result: Ok(FileAttachment {
                    id: 4,
                    date: None,
                    name: "old.png".into(),
                    file_type: "image/png".into(),
                }),
            },
        );
        assert!(app.composer.attachment().is_none());
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_submit_validation_keeps_compose_open() {
        let mut app = test_app();
        app.mode = Mode::Compose;
        app.composer.set_content("short");
        app.composer.begin_submit();
        handle_app_event(
            &mut app,
            AppEvent::SubmitFinished {
                result: Err(ApiError::Validation {
                    message: "Validator error".into(),
                    errors: BTreeMap::from([(
                        "content".to_string(),
                        "size must be between 10 and 5000".to_string(),
                    )]),
                }),
            },
        );
        assert_eq!(app.mode, Mode::Compose);
        assert_eq!(
            app.composer.field_error("content"),
            Some("size must be between 10 and 5000")
        );
    }

    #[tokio::test]
    async fn test_submit_success_returns_to_browse() {
        let mut app = test_app();
        app.mode = Mode::Compose;
        app.composer.set_content("Test discussion content");
        app.composer.begin_submit();
        handle_app_event(&mut app, AppEvent::SubmitFinished { result: Ok(()) });
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.composer.content(), "");
    }
}
