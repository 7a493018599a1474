//! Status bar
//!
//! Displays who we are, who is online, and key hints for the current view.

use duet_app::{App, View};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::palette;

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let me = app.user().map_or_else(String::new, ToString::to_string);
    let identity = Span::styled(
        me,
        Style::default().fg(palette::color(app.color())).add_modifier(Modifier::BOLD),
    );

    let hints = match app.view() {
        View::Conversation { .. } => "Enter send | Esc back | PgUp/PgDn scroll | Ctrl-C quit",
        _ => "Ctrl-C quit",
    };
    let info = format!(" | {} online | {hints}", app.friends().len());

    let status_line = Line::from(vec![
        Span::raw(" "),
        identity,
        Span::styled(info, Style::default().fg(Color::Gray)),
    ]);

    let paragraph = Paragraph::new(status_line).style(Style::default().bg(Color::Black));

    frame.render_widget(paragraph, area);
}
