//! Input handling for the TUI.
//!
//! Keys are routed by what currently owns the screen: the delete
//! confirmation, then the help overlay, then the compose dialogs, and
//! finally the browse layout.

use crate::api::FeedScope;
use crate::app::{App, AppEvent, Focus, Mode};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::helpers::{open_selected_attachment, spawn_submit, spawn_upload, spawn_user_page};
use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // Ctrl+C always quits, even inside a dialog.
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    if !app.feed.deletion().is_idle() {
        return handle_confirm_input(app, code);
    }

    match app.mode {
        Mode::Help => {
            if matches!(code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
                app.mode = Mode::Browse;
            }
            Ok(Action::Continue)
        }
        Mode::Compose => Ok(handle_compose_input(app, code, modifiers, event_tx)),
        Mode::AttachPath { .. } => Ok(handle_attach_input(app, code, event_tx)),
        Mode::Browse => handle_browse_input(app, code, event_tx),
    }
}

/// Handle input while the delete confirmation is showing.
///
/// Keys other than confirm and cancel are swallowed, including while the
/// request is in flight.
fn handle_confirm_input(app: &mut App, code: KeyCode) -> Result<Action> {
    if app.feed.deletion().is_deleting() {
        return Ok(Action::Continue);
    }
    match code {
        KeyCode::Char('y') | KeyCode::Enter => app.feed.confirm_delete()?,
        KeyCode::Char('n') | KeyCode::Esc => {
            app.feed.cancel_delete();
        }
        _ => {}
    }
    Ok(Action::Continue)
}

/// Handle input in the browse layout (feed + users panels).
fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('?') => app.mode = Mode::Help,
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),

        // Feed
        KeyCode::Char('m') => {
            if !app.feed.load_older() && app.feed.state().is_last_page() {
                app.set_status("No older discussions");
            }
        }
        KeyCode::Char('n') => {
            if app.feed.state().unseen_count() == 0 {
                app.set_status("Nothing new");
            } else {
                app.feed.load_newer();
            }
        }
        KeyCode::Char('r') => {
            app.feed.poll_now();
            app.set_status("Checking for new discussions...");
        }
        KeyCode::Char('d') => {
            if let Some(id) = app.selected_card().map(|c| c.id) {
                app.feed.request_delete(id)?;
            }
        }
        KeyCode::Char('o') => open_selected_attachment(app),
        KeyCode::Char('c') => {
            if app.is_logged_in() {
                app.mode = Mode::Compose;
            } else {
                app.set_status("Log in to post (parley login)");
            }
        }
        KeyCode::Char('g') => app.switch_scope(FeedScope::Global),

        // Users
        KeyCode::Char(']') => match app.users.begin_next() {
            Some(request) => spawn_user_page(app, request, event_tx),
            None => app.set_status("Last page of users"),
        },
        KeyCode::Char('[') => match app.users.begin_previous() {
            Some(request) => spawn_user_page(app, request, event_tx),
            None => app.set_status("First page of users"),
        },
        KeyCode::Enter if app.focus == Focus::Users => {
            if let Some(username) = app.users.selected_user().map(|u| u.username.clone()) {
                app.switch_scope(FeedScope::User(username));
            }
        }
        _ => {}
    }
    Ok(Action::Continue)
}

/// Handle input while typing a new discussion.
fn handle_compose_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if app.composer.is_pending() {
        return Action::Continue;
    }
    match code {
        KeyCode::Esc => {
            app.composer.cancel();
            app.mode = Mode::Browse;
        }
        KeyCode::Enter => spawn_submit(app, event_tx),
        KeyCode::Backspace => app.composer.pop(),
        KeyCode::Char('a') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.mode = Mode::AttachPath {
                input: String::new(),
            };
        }
        KeyCode::Char(c) => app.composer.push(c),
        _ => {}
    }
    Action::Continue
}

/// Handle input while typing the path of a file to attach.
fn handle_attach_input(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Mode::AttachPath { input } = &mut app.mode else {
        return Action::Continue;
    };
    match code {
        KeyCode::Esc => app.mode = Mode::Compose,
        KeyCode::Enter => {
            let path = PathBuf::from(input.trim());
            app.mode = Mode::Compose;
            if !path.as_os_str().is_empty() {
                spawn_upload(app, path, event_tx);
            }
        }
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(c) => input.push(c),
        _ => {}
    }
    Action::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, Discussion, DiscussionPage, UserSummary};
    use crate::config::Config;
    use crate::feed::FeedEvent;

    fn user(id: i64) -> UserSummary {
        UserSummary {
            id,
            username: format!("user{id}"),
            display_name: format!("display{id}"),
            image: None,
        }
    }

    fn test_app(viewer: Option<UserSummary>) -> (App, mpsc::Sender<AppEvent>) {
        let config = Config::default();
        let client = ApiClient::new(
            &config.server_url,
            &config.api_prefix,
            config.request_timeout(),
        )
        .unwrap();
        let (feed_tx, _feed_rx) = mpsc::channel(16);
        let (tx, _rx) = mpsc::channel(16);
        let mut app = App::new(client, config, viewer, FeedScope::Global, feed_tx);
        app.feed.start();
        let content = vec![Discussion {
            id: 10,
            content: "This is the first discussion".into(),
            date: 1561294668539,
            user: user(1),
            attachment: None,
        }];
        app.handle_feed_event(FeedEvent::InitialLoaded {
            controller: app.feed.id(),
            result: Ok(DiscussionPage {
                content,
                ..DiscussionPage::default()
            }),
        });
        (app, tx)
    }

    fn press(app: &mut App, tx: &mpsc::Sender<AppEvent>, code: KeyCode) -> Result<Action> {
        handle_input(app, code, KeyModifiers::NONE, tx)
    }

    #[tokio::test]
    async fn test_quit() {
        let (mut app, tx) = test_app(None);
        assert!(matches!(press(&mut app, &tx, KeyCode::Char('q')), Ok(Action::Quit)));
    }

    #[tokio::test]
    async fn test_delete_by_author_opens_confirmation() {
        let (mut app, tx) = test_app(Some(user(1)));
        press(&mut app, &tx, KeyCode::Char('d')).unwrap();
        assert!(!app.feed.deletion().is_idle());

        // 'q' is swallowed by the confirmation.
        assert!(matches!(
            press(&mut app, &tx, KeyCode::Char('q')),
            Ok(Action::Continue)
        ));

        press(&mut app, &tx, KeyCode::Esc).unwrap();
        assert!(app.feed.deletion().is_idle());
    }

    #[tokio::test]
    async fn test_delete_by_other_user_is_refused() {
        let (mut app, tx) = test_app(Some(user(2)));
        assert!(press(&mut app, &tx, KeyCode::Char('d')).is_err());
        assert!(app.feed.deletion().is_idle());
    }

    #[tokio::test]
    async fn test_compose_requires_login() {
        let (mut app, tx) = test_app(None);
        press(&mut app, &tx, KeyCode::Char('c')).unwrap();
        assert_eq!(app.mode, Mode::Browse);
    }

    #[tokio::test]
    async fn test_compose_typing_and_cancel() {
        let (mut app, tx) = test_app(Some(user(1)));
        press(&mut app, &tx, KeyCode::Char('c')).unwrap();
        assert_eq!(app.mode, Mode::Compose);
        for c in "hi!".chars() {
            press(&mut app, &tx, KeyCode::Char(c)).unwrap();
        }
        press(&mut app, &tx, KeyCode::Backspace).unwrap();
        assert_eq!(app.composer.content(), "hi");

        // 'q' types, it does not quit.
        press(&mut app, &tx, KeyCode::Char('q')).unwrap();
        assert_eq!(app.composer.content(), "hiq");

        press(&mut app, &tx, KeyCode::Esc).unwrap();
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.composer.content(), "");
    }

    #[tokio::test]
    async fn test_attach_path_dialog() {
        let (mut app, tx) = test_app(Some(user(1)));
        app.mode = Mode::Compose;
        handle_input(&mut app, KeyCode::Char('a'), KeyModifiers::CONTROL, &tx).unwrap();
        press(&mut app, &tx, KeyCode::Char('x')).unwrap();
        assert_eq!(
            app.mode,
            Mode::AttachPath {
                input: "x".to_string()
            }
        );
        press(&mut app, &tx, KeyCode::Esc).unwrap();
        assert_eq!(app.mode, Mode::Compose);
    }

    #[tokio::test]
    async fn test_help_toggle() {
        let (mut app, tx) = test_app(None);
        press(&mut app, &tx, KeyCode::Char('?')).unwrap();
        assert_eq!(app.mode, Mode::Help);
        press(&mut app, &tx, KeyCode::Esc).unwrap();
        assert_eq!(app.mode, Mode::Browse);
    }
}
