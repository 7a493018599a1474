//! Client application layer for duet.
//!
//! Pure state machines plus a generic runtime, so the same orchestration runs
//! behind the terminal UI and behind scripted drivers in tests.
//!
//! # Components
//!
//! - [`App`]: view state machine (sign-in, friend list, conversation)
//! - [`Transcript`]: ordered conversation lines with typing placeholders
//! - [`TypingCoordinator`]: single-flight "is typing" heartbeat
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: event loop tying the above to a driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod input;
mod runtime;
mod state;
mod transcript;
mod typing;

pub use action::AppAction;
pub use app::App;
pub use driver::Driver;
pub use event::AppEvent;
pub use input::{InputState, KeyInput};
pub use runtime::{Runtime, RuntimeConfig};
pub use state::View;
pub use transcript::{Line, LineKind, Transcript};
pub use typing::{DEFAULT_TYPING_WINDOW, TypingCoordinator};
