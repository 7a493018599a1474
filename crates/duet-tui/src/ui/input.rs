//! Input line
//!
//! Displays the input buffer with cursor. Text longer than the box scrolls
//! horizontally so the cursor stays visible.

use duet_app::InputState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

const PROMPT: &str = "> ";
const BORDER_WIDTH: u16 = 1;

/// Render the input line.
pub fn render(frame: &mut Frame, input: &InputState, area: Rect) {
    let prompt_width = PROMPT.len() as u16;
    let text_width = usize::from(area.width.saturating_sub(2 * BORDER_WIDTH + prompt_width)).max(1);

    // Keep the cursor in the last column once the text overflows.
    let skip = (input.cursor() + 1).saturating_sub(text_width);
    let visible: String = input.buffer().chars().skip(skip).take(text_width).collect();

    let paragraph = Paragraph::new(format!("{PROMPT}{visible}"))
        .style(Style::default().fg(Color::White))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);

    let cursor_x = area
        .x
        .saturating_add(BORDER_WIDTH + prompt_width)
        .saturating_add((input.cursor() - skip) as u16)
        .min(area.right().saturating_sub(BORDER_WIDTH));
    let cursor_y = area.y.saturating_add(BORDER_WIDTH);

    frame.set_cursor_position((cursor_x, cursor_y));
}

/// Render a greyed-out hint where the input line would be.
pub fn render_hint(frame: &mut Frame, hint: &str, area: Rect) {
    let paragraph = Paragraph::new(hint.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}
