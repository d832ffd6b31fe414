use crate::app::{App, Focus};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Render the user directory panel
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Users;
    let directory = &app.users;

    let mut items: Vec<ListItem> = if directory.users().is_empty() {
        let text = if directory.is_loading() {
            "Loading users..."
        } else {
            "No users"
        };
        vec![ListItem::new(text)]
    } else {
        directory
            .labels()
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let style = if i == directory.selected() && is_focused {
                    Style::default().bg(Color::DarkGray).fg(Color::White)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(label, style)))
            })
            .collect()
    };

    if let Some(error) = directory.error() {
        items.push(ListItem::new(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        ))));
    }

    let mut nav = Vec::new();
    if directory.has_previous() {
        nav.push("[ prev");
    }
    if directory.has_next() {
        nav.push("] next");
    }
    if !nav.is_empty() {
        items.push(ListItem::new(Line::from(Span::styled(
            nav.join("  "),
            Style::default().fg(Color::DarkGray),
        ))));
    }

    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let page = directory.page();
    let title = if page.total_pages > 1 {
        format!("Users ({}/{})", page.number + 1, page.total_pages)
    } else {
        "Users".to_string()
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );

    f.render_widget(list, area);
}
