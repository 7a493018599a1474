//! Friend list
//!
//! Everyone else currently online, with the selection highlighted.

use duet_app::App;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

const SELECTED_PREFIX: &str = "> ";
const UNSELECTED_PREFIX: &str = "  ";

/// Render the friend list.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Online ({}) ", app.friends().len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if app.friends().is_empty() {
        let empty = ListItem::new(Line::from(Span::styled(
            "Nobody else is online yet",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(List::new(vec![empty]).block(block), area);
        return;
    }

    let items: Vec<ListItem> = app
        .friends()
        .iter()
        .enumerate()
        .map(|(row, friend)| {
            let (prefix, style) = if row == app.selected() {
                (SELECTED_PREFIX, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                (UNSELECTED_PREFIX, Style::default())
            };
            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(friend.as_str().to_string(), style),
            ]))
        })
        .collect();

    // ListState scrolls the selection into view on long lists.
    let mut state = ListState::default().with_selected(Some(app.selected()));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}
