use crate::app::{App, Mode};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(&**msg)
    } else if let Some(error) = app.feed.state().initial_error() {
        Cow::Owned(format!("Error: {}", error))
    } else {
        match app.mode {
            Mode::Compose => Cow::Borrowed("Type your discussion | Ctrl+a attach | ENTER post | ESC cancel"),
            Mode::AttachPath { .. } => Cow::Borrowed("File path | ENTER upload | ESC back"),
            Mode::Help => Cow::Borrowed("? or ESC close help"),
            Mode::Browse => {
                let who = match &app.viewer {
                    Some(user) => Cow::Owned(format!("{} | ", user.username)),
                    None => Cow::Borrowed("anonymous | "),
                };
                Cow::Owned(format!(
                    "{}[m]ore [n]ew [d]elete [c]ompose [o]pen [Tab]switch [?]help [q]uit",
                    who
                ))
            }
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
