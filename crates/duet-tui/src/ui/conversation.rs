//! Conversation area
//!
//! Displays the transcript, newest at the bottom, in each author's colour.

use duet_app::{App, Line as TranscriptLine, LineKind};
use duet_proto::UserId;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::palette;

const BORDER_SIZE: u16 = 2;

/// Render the conversation with `peer`.
pub fn render(frame: &mut Frame, app: &App, peer: &UserId, area: Rect) {
    let title = if app.scroll() > 0 {
        format!(" {peer} (+{} newer) ", app.scroll())
    } else {
        format!(" {peer} ")
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let lines = app.transcript().lines();
    if lines.is_empty() {
        let hint = ListItem::new(Line::from(Span::styled(
            format!("Say hello to {peer}"),
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(List::new(vec![hint]).block(block), area);
        return;
    }

    let visible_height = usize::from(area.height.saturating_sub(BORDER_SIZE));
    let end = lines.len().saturating_sub(app.scroll());
    let start = end.saturating_sub(visible_height);
    let items: Vec<ListItem> = lines[start..end].iter().map(render_line).collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_line(line: &TranscriptLine) -> ListItem<'static> {
    let author = Style::default().fg(palette::color(line.color)).add_modifier(Modifier::BOLD);
    let stamp = Span::styled(format!("{} ", line.stamp), Style::default().fg(Color::DarkGray));

    let spans = match line.kind {
        LineKind::Received | LineKind::Sent => vec![
            stamp,
            Span::styled(line.from.to_string(), author),
            Span::raw(": "),
            Span::raw(line.text.clone()),
        ],
        LineKind::Typing => vec![
            stamp,
            Span::styled(line.from.to_string(), author),
            Span::styled(
                format!(" is typing{}", line.text),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ],
    };
    ListItem::new(Line::from(spans))
}

#[cfg(test)]
mod tests {
    use duet_app::{AppEvent, KeyInput};
    use duet_proto::{ChatEvent, PresenceSnapshot, TypingEvent, UserId};

    use crate::{App, ui::test_support::render_to_string};

    fn id(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn talking_to_bob() -> App {
        let mut app = App::new(5);
        for c in "alice".chars() {
            app.handle(AppEvent::Key(KeyInput::Char(c)));
        }
        app.handle(AppEvent::Key(KeyInput::Enter));
        app.handle(AppEvent::Connected);
        app.handle(AppEvent::PresenceChanged(PresenceSnapshot(vec![id("bob")])));
        app.handle(AppEvent::Key(KeyInput::Enter));
        app
    }

    fn from_bob(text: &str) -> AppEvent {
        AppEvent::ChatReceived(ChatEvent {
            to: id("alice"),
            from: id("bob"),
            text: text.into(),
            color: 120,
        })
    }

    #[test]
    fn empty_conversation_shows_hint() {
        assert!(render_to_string(&talking_to_bob(), 60, 14).contains("Say hello to bob"));
    }

    #[test]
    fn chat_lines_show_author_and_text() {
        let mut app = talking_to_bob();
        app.handle(from_bob("hello there"));

        let screen = render_to_string(&app, 60, 14);
        assert!(screen.contains("bob: hello there"));
    }

    #[test]
    fn typing_placeholder_is_rendered() {
        let mut app = talking_to_bob();
        app.handle(AppEvent::TypingReceived(TypingEvent {
            is_typing: true,
            to: id("alice"),
            color: 120,
            from: id("bob"),
        }));

        assert!(render_to_string(&app, 60, 14).contains("bob is typing"));
    }

    #[test]
    fn newest_lines_win_when_space_runs_out() {
        let mut app = talking_to_bob();
        for i in 0..40 {
            app.handle(from_bob(&format!("line {i:02}")));
        }

        let screen = render_to_string(&app, 60, 14);
        assert!(screen.contains("line 39"));
        assert!(!screen.contains("line 00"));
    }
}
