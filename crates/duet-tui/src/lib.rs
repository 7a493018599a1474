//! Terminal UI for duet
//!
//! A thin shell over [`duet_app::Driver`] that provides terminal-specific
//! I/O and the WebSocket session. All orchestration logic lives in the
//! generic [`duet_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod palette;
pub mod terminal;
pub mod transport;
pub mod ui;

pub use duet_app::{App, AppAction, AppEvent, Driver, KeyInput, Runtime, RuntimeConfig};
pub use terminal::{TerminalDriver, TerminalError};
pub use transport::{Session, TransportError};
