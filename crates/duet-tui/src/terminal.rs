//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. The relay session runs over a
//! WebSocket; its messages arrive on an internal channel.

use std::{
    io::{self, Stdout, stdout},
    time::Duration,
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use duet_app::{App, AppEvent, Driver, KeyInput};
use duet_proto::{Envelope, UserId};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::{
    sync::mpsc,
    time::{Interval, MissedTickBehavior},
};

use crate::{
    transport::{self, Session, TransportError},
    ui,
};

/// Spinner and placeholder animation rate.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Relay messages buffered before the reader task waits on the UI loop.
const INBOUND_CAPACITY: usize = 1;

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Send attempted before a session was opened.
    #[error("not connected")]
    NotConnected,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), and the relay
/// session (tokio-tungstenite).
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    ticker: Interval,
    server: String,
    session: Option<Session>,
    inbound_tx: mpsc::Sender<AppEvent>,
    inbound_rx: mpsc::Receiver<AppEvent>,
}

impl TerminalDriver {
    /// Take over the terminal. `server` is the relay base URL.
    pub fn new(server: String) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Ok(Self { terminal, event_stream, ticker, server, session: None, inbound_tx, inbound_rx })
    }

    /// Convert a crossterm key event to `KeyInput`.
    fn convert_key(key: KeyEvent) -> Option<KeyInput> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c' | 'C') => Some(KeyInput::Interrupt),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            KeyCode::PageUp => Some(KeyInput::PageUp),
            KeyCode::PageDown => Some(KeyInput::PageDown),
            _ => None,
        }
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;

            // Terminal events
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        Ok(Self::convert_key(key_event).map(AppEvent::Key))
                    },
                    Some(Ok(Event::Resize(cols, rows))) => Ok(Some(AppEvent::Resize(cols, rows))),
                    Some(Err(e)) => Err(TerminalError::Io(e)),
                    _ => Ok(None),
                }
            }

            // Relay messages
            Some(event) = self.inbound_rx.recv() => Ok(Some(event)),

            // Animation
            _ = self.ticker.tick() => Ok(Some(AppEvent::Tick)),
        }
    }

    async fn connect(&mut self, user: &UserId) -> Result<(), Self::Error> {
        let session = transport::connect(&self.server, user, self.inbound_tx.clone()).await?;
        self.session = Some(session);
        Ok(())
    }

    async fn send(&mut self, envelope: Envelope) -> Result<(), Self::Error> {
        let session = self.session.as_mut().ok_or(TerminalError::NotConnected)?;
        session.send(&envelope).await?;
        Ok(())
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| {
            ui::render(frame, app);
        })?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_interrupts() {
        let key = press(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(TerminalDriver::convert_key(key), Some(KeyInput::Interrupt));
    }

    #[test]
    fn other_control_chords_are_ignored() {
        let key = press(KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(TerminalDriver::convert_key(key), None);
    }

    #[test]
    fn plain_and_shifted_chars_pass_through() {
        assert_eq!(
            TerminalDriver::convert_key(press(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some(KeyInput::Char('x'))
        );
        assert_eq!(
            TerminalDriver::convert_key(press(KeyCode::Char('X'), KeyModifiers::SHIFT)),
            Some(KeyInput::Char('X'))
        );
        assert_eq!(
            TerminalDriver::convert_key(press(KeyCode::PageUp, KeyModifiers::NONE)),
            Some(KeyInput::PageUp)
        );
    }
}
