//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from the terminal
//! and the relay transport. The terminal frontend implements it with crossterm
//! and a WebSocket; tests implement it with a scripted event queue.

use std::future::Future;

use duet_proto::{Envelope, UserId};

use crate::{App, AppEvent};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next input event: a key, a tick, a resize, or something
    /// the relay sent.
    ///
    /// Returns `None` if nothing happened this cycle. Must be cancel-safe:
    /// the runtime races it against typing timers and may drop the future
    /// before it completes.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Open a session on the relay as `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay cannot be reached or refuses the upgrade.
    fn connect(&mut self, user: &UserId) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Publish an envelope on the open session.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or the write fails.
    fn send(&mut self, envelope: Envelope) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Close the session, if one is open. Never fails.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
