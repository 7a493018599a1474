//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`TypingCoordinator`]: outgoing typing heartbeat
//! - [`Driver`]: Platform-specific I/O

use std::time::Duration;

use duet_proto::{Envelope, TypingEvent};

use crate::{App, AppAction, AppEvent, DEFAULT_TYPING_WINDOW, Driver, TypingCoordinator};

/// Timing knobs for the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Quiet window after the last keystroke before "stopped typing".
    pub typing_window: Duration,
    /// How long the farewell screen stays up after the session closes.
    pub grace_period: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { typing_window: DEFAULT_TYPING_WINDOW, grace_period: Duration::from_secs(1) }
    }
}

/// What woke the event loop.
enum Wake<E> {
    Input(Result<Option<AppEvent>, E>),
    TypingExpired(u64),
}

/// Generic runtime that orchestrates App, typing heartbeat, and Driver.
pub struct Runtime<D: Driver> {
    driver: D,
    app: App,
    typing: TypingCoordinator,
    config: RuntimeConfig,
}

impl<D: Driver> Runtime<D> {
    /// Create a new runtime. Must be called inside a Tokio runtime.
    pub fn new(driver: D, app: App, config: RuntimeConfig) -> Self {
        let typing = TypingCoordinator::new(config.typing_window);
        Self { driver, app, typing, config }
    }

    /// Run the main event loop until the app quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render. Relay
    /// failures are shown to the user and end the loop normally.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        loop {
            if self.process_cycle().await? {
                break;
            }
        }
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let wake = tokio::select! {
            input = self.driver.poll_event() => Wake::Input(input),
            generation = self.typing.expired() => Wake::TypingExpired(generation),
        };

        match wake {
            Wake::Input(input) => match input? {
                Some(event) => {
                    let actions = self.app.handle(event);
                    self.process_actions(actions).await
                },
                None => Ok(false),
            },
            Wake::TypingExpired(generation) => {
                if let Some(stopped) = self.typing.expire(generation) {
                    self.publish_typing(stopped).await;
                }
                Ok(false)
            },
        }
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => {
                        self.shutdown().await;
                        return Ok(true);
                    },
                    AppAction::Connect { user } => {
                        let event = match self.driver.connect(&user).await {
                            Ok(()) => {
                                tracing::info!(%user, "session established");
                                AppEvent::Connected
                            },
                            Err(e) => {
                                tracing::error!(%user, error = %e, "failed to connect");
                                AppEvent::Error { message: e.to_string() }
                            },
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                    AppAction::SendChat(chat) => {
                        let event = match self.driver.send(Envelope::Chat(chat.clone())).await {
                            Ok(()) => AppEvent::ChatSent(chat),
                            Err(e) => {
                                tracing::error!(to = %chat.to, error = %e, "failed to send chat");
                                AppEvent::Error { message: e.to_string() }
                            },
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                    AppAction::RestartTyping(template) => {
                        if let Some(started) = self.typing.restart(template) {
                            self.publish_typing(started).await;
                        }
                    },
                    AppAction::StopTyping(stopped) => {
                        self.typing.cancel();
                        self.publish_typing(stopped).await;
                    },
                    AppAction::CancelTyping => {
                        self.typing.cancel();
                    },
                }
            }
        }
        Ok(false)
    }

    /// Publish a typing signal. Failures are logged and dropped; a lost
    /// heartbeat only leaves a stale placeholder on the peer's screen.
    async fn publish_typing(&mut self, typing: TypingEvent) {
        let is_typing = typing.is_typing;
        if let Err(e) = self.driver.send(Envelope::Typing(typing)).await {
            tracing::warn!(is_typing, error = %e, "failed to publish typing signal");
        }
    }

    /// Cancel timers, close the session and let the farewell screen linger.
    async fn shutdown(&mut self) {
        self.typing.cancel();
        self.driver.close().await;
        tokio::time::sleep(self.config.grace_period).await;
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the Driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
