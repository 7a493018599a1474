//! Sign-in screen
//!
//! Name prompt, then a spinner while the relay accepts the session.

use duet_app::{App, View};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::input;

const PANEL_WIDTH: u16 = 48;
const PANEL_HEIGHT: u16 = 7;

/// Render the sign-in or connecting screen.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let panel = super::centered(area, PANEL_WIDTH, PANEL_HEIGHT);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" duet ")
        .border_style(Style::default().fg(crate::palette::color(app.color())));
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let [prompt_area, input_area, message_area] = chunks.as_ref() else {
        return;
    };

    if *app.view() == View::Connecting {
        let who = app.user().map_or("", |user| user.as_str());
        let line = Line::from(vec![
            Span::raw("Connecting as "),
            Span::styled(who.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::raw(app.spinner_glyph()),
        ]);
        frame.render_widget(Paragraph::new(line), *prompt_area);
        return;
    }

    frame.render_widget(Paragraph::new("Who are you?"), *prompt_area);
    input::render(frame, app.input(), *input_area);

    if let Some(message) = app.status_message() {
        let paragraph =
            Paragraph::new(message.to_string()).style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, *message_area);
    }
}

#[cfg(test)]
mod tests {
    use duet_app::{AppEvent, KeyInput};

    use crate::{App, ui::test_support::render_to_string};

    fn typed(name: &str) -> App {
        let mut app = App::new(5);
        for c in name.chars() {
            app.handle(AppEvent::Key(KeyInput::Char(c)));
        }
        app
    }

    #[test]
    fn prompt_shows_typed_name() {
        let screen = render_to_string(&typed("alice"), 60, 12);
        assert!(screen.contains("Who are you?"));
        assert!(screen.contains("> alice"));
    }

    #[test]
    fn invalid_name_shows_reason() {
        let mut app = typed("all");
        app.handle(AppEvent::Key(KeyInput::Enter));

        assert!(render_to_string(&app, 60, 12).contains("Invalid name"));
    }

    #[test]
    fn connecting_shows_identity() {
        let mut app = typed("alice");
        app.handle(AppEvent::Key(KeyInput::Enter));

        assert!(render_to_string(&app, 60, 12).contains("Connecting as alice"));
    }
}
