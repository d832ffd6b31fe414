use crate::app::{App, Focus};
use crate::feed::{unseen_message, Banner, FeedView, LoadMore, EMPTY_FEED_MESSAGE};
use crate::presenter::DiscussionCard;
use crate::util::{strip_control_chars, truncate_to_width, wrap_to_width};
use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the discussion feed panel
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Feed;
    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let title = match app.feed.scope().username() {
        Some(username) => format!("Discussions - {}", username),
        None => "Discussions".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    let spinner = SPINNER[app.spinner_frame % SPINNER.len()];

    let (banner, items, load_more) = match app.feed.view() {
        FeedView::Loading => {
            let text = format!("{} Loading...", spinner);
            f.render_widget(Paragraph::new(text).block(block), area);
            return;
        }
        FeedView::Empty => {
            let text = match app.feed.state().initial_error() {
                Some(error) => format!("{}\n\n{}", EMPTY_FEED_MESSAGE, error),
                None => EMPTY_FEED_MESSAGE.to_string(),
            };
            f.render_widget(Paragraph::new(text).block(block), area);
            return;
        }
        FeedView::Items {
            banner,
            items,
            load_more,
        } => (banner, items, load_more),
    };

    // Two columns of border, one of padding.
    let width = area.width.saturating_sub(3) as usize;
    let now = Utc::now();
    let viewer = app.viewer_id();
    let endpoints = app.client.endpoints();

    let mut list_items: Vec<ListItem> = Vec::with_capacity(items.len() + 2);

    if let Some(banner) = banner {
        let text = match banner {
            Banner::Unseen(count) => format!("{}  [n] show", unseen_message(count)),
            Banner::Loading => format!("{} Loading new discussions...", spinner),
        };
        list_items.push(ListItem::new(Line::from(Span::styled(
            text,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))));
    }
    let first_item = list_items.len();

    for (i, discussion) in items.iter().enumerate() {
        let card = DiscussionCard::new(discussion, viewer, endpoints, now);
        list_items.push(discussion_item(&card, width, i == app.selected && is_focused));
    }

    match load_more {
        LoadMore::Available => list_items.push(ListItem::new(Line::from(Span::styled(
            "[m] load older discussions",
            Style::default().fg(Color::DarkGray),
        )))),
        LoadMore::Loading => list_items.push(ListItem::new(format!("{} Loading...", spinner))),
        LoadMore::Hidden => {}
    }

    let mut state = ListState::default().with_selected(Some(first_item + app.selected));
    let list = List::new(list_items).block(block);
    f.render_stateful_widget(list, area, &mut state);
}

/// One discussion: a header line, the wrapped content, and an attachment line.
fn discussion_item(card: &DiscussionCard, width: usize, selected: bool) -> ListItem<'static> {
    let header_style = if selected {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let mut header = vec![
        Span::styled(truncate_to_width(&card.author, width).into_owned(), header_style),
        Span::styled(format!("  {}", card.when), Style::default().fg(Color::DarkGray)),
    ];
    if card.deletable {
        header.push(Span::styled("  [d]", Style::default().fg(Color::Red)));
    }

    let mut lines = vec![Line::from(header)];
    let content = strip_control_chars(&card.content);
    for line in wrap_to_width(&content, width.saturating_sub(2)) {
        lines.push(Line::from(format!("  {}", line)));
    }

    if let Some(url) = &card.image_url {
        lines.push(Line::from(Span::styled(
            truncate_to_width(&format!("  [o] image {}", url), width).into_owned(),
            Style::default().fg(Color::Cyan),
        )));
    } else if let Some(name) = &card.attachment_name {
        lines.push(Line::from(Span::styled(
            format!("  attachment {}", truncate_to_width(name, width.saturating_sub(13))),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::from(""));

    ListItem::new(lines)
}
