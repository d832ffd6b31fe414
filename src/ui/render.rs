//! Render functions for the TUI.
//!
//! Draws the browse layout and then whichever overlay owns the screen.

use crate::app::{App, Mode};
use crate::feed::DeletionState;
use crate::util::strip_control_chars;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{feed, help, status, users};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[0]);

    feed::render(f, app, panels[0]);
    users::render(f, app, panels[1]);
    status::render(f, app, chunks[1]);

    match &app.mode {
        Mode::Help => help::render(f),
        Mode::Compose => render_compose_overlay(f, app),
        Mode::AttachPath { input } => render_attach_overlay(f, input),
        Mode::Browse => {}
    }

    if !app.feed.deletion().is_idle() {
        render_confirm_overlay(f, app);
    }
}

/// Rect of at most `width` x `height`, centered in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn overlay_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
}

/// Render the delete confirmation centered on screen.
fn render_confirm_overlay(f: &mut Frame, app: &App) {
    let deletion = app.feed.deletion();
    let Some(prompt) = deletion.prompt() else {
        return;
    };

    let overlay = centered(f.area(), 60, 9);
    if overlay.width < 10 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let mut lines = vec![Line::from(prompt), Line::from("")];
    match deletion.state() {
        DeletionState::Deleting { .. } => lines.push(Line::from("Deleting...")),
        DeletionState::Confirming { error, .. } => {
            if let Some(error) = error {
                lines.push(Line::from(Span::styled(
                    format!("Error: {}", error),
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::from(""));
            }
            lines.push(Line::from("(y) Confirm  (n/Esc) Cancel"));
        }
        DeletionState::Idle => {}
    }

    let paragraph = Paragraph::new(lines)
        .block(overlay_block(" Delete Discussion "))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, overlay);
}

/// Render the compose dialog with the draft, attachment and any errors.
fn render_compose_overlay(f: &mut Frame, app: &App) {
    let overlay = centered(f.area(), 70, 14);
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let composer = &app.composer;
    let mut lines = vec![Line::from(format!(
        "> {}_",
        strip_control_chars(composer.content())
    ))];
    if let Some(error) = composer.field_error("content") {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));

    if composer.is_uploading() {
        lines.push(Line::from("Uploading attachment..."));
    } else if let Some(attachment) = composer.attachment() {
        lines.push(Line::from(format!("Attachment: {}", attachment.name)));
    }
    if let Some(error) = composer.error() {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    }
    if composer.is_pending() {
        lines.push(Line::from("Posting..."));
    } else {
        lines.push(Line::from("(Enter) Post  (Ctrl+a) Attach  (Esc) Cancel"));
    }

    let paragraph = Paragraph::new(lines)
        .block(overlay_block(" New Discussion "))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, overlay);
}

/// Render the attachment path prompt.
fn render_attach_overlay(f: &mut Frame, input: &str) {
    let overlay = centered(f.area(), 60, 7);
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let text = format!(
        "Path of the file to attach:\n\n> {}_\n\n(Enter) Upload  (Esc) Back",
        input
    );
    let paragraph = Paragraph::new(text).block(overlay_block(" Attach File "));
    f.render_widget(paragraph, overlay);
}
