//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod conversation;
mod friends;
mod input;
mod sign_in;
mod status;

use duet_app::View;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::App;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    match app.view() {
        View::SignIn | View::Connecting => sign_in::render(frame, app, frame.area()),
        View::Exiting { message } => render_farewell(frame, message, frame.area()),
        View::Friends | View::Conversation { .. } => render_session(frame, app),
    }
}

/// Friend list or conversation, with the input line and status bar.
fn render_session(frame: &mut Frame, app: &App) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    match app.view().peer() {
        Some(peer) => {
            conversation::render(frame, app, peer, *main_area);
            input::render(frame, app.input(), *input_area);
        },
        None => {
            friends::render(frame, app, *main_area);
            input::render_hint(frame, "Up/Down to choose, Enter to talk", *input_area);
        },
    }
    status::render(frame, app, *status_area);
}

fn render_farewell(frame: &mut Frame, message: &str, area: Rect) {
    let paragraph = Paragraph::new(message.to_string())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" duet "));

    frame.render_widget(paragraph, centered(area, 40, 3));
}

/// Rectangle of at most `width` x `height` centred in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}


#[cfg(test)]
mod tests {
    use duet_app::{AppEvent, KeyInput};
    use duet_proto::{PresenceSnapshot, UserId};

    use super::test_support::render_to_string;
    use crate::App;

    fn signed_in(name: &str) -> App {
        let mut app = App::new(5);
        for c in name.chars() {
            app.handle(AppEvent::Key(KeyInput::Char(c)));
        }
        app.handle(AppEvent::Key(KeyInput::Enter));
        app.handle(AppEvent::Connected);
        app
    }

    #[test]
    fn farewell_is_shown_on_exit() {
        let mut app = App::new(5);
        app.handle(AppEvent::Key(KeyInput::Interrupt));

        assert!(render_to_string(&app, 60, 10).contains("Goodbye"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = signed_in("alice");
        app.handle(AppEvent::PresenceChanged(PresenceSnapshot(vec![
            UserId::parse("bob").unwrap(),
        ])));
        render_to_string(&app, 3, 2);
        app.handle(AppEvent::Key(KeyInput::Enter));
        render_to_string(&app, 3, 2);
        app.handle(AppEvent::Key(KeyInput::Interrupt));
        render_to_string(&app, 3, 2);
    }
}
