//! Application input events.
//!
//! This module defines [`AppEvent`], the full set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two sources:
//! - User interactions (keyboard, resize) and animation ticks.
//! - Relay messages and connection notifications from the driver.

use duet_proto::{ChatEvent, Envelope, PresenceSnapshot, TypingEvent};

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic animation tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Session established.
    Connected,

    /// Chat line from a peer.
    ChatReceived(ChatEvent),

    /// Our own chat line was published.
    ChatSent(ChatEvent),

    /// Peer started or stopped typing.
    TypingReceived(TypingEvent),

    /// Online users changed.
    PresenceChanged(PresenceSnapshot),

    /// Relay closed the connection.
    Disconnected {
        /// Close reason, if the relay gave one.
        reason: Option<String>,
    },

    /// Unrecoverable error.
    Error {
        /// Error description.
        message: String,
    },
}

impl From<Envelope> for AppEvent {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Chat(chat) => Self::ChatReceived(chat),
            Envelope::Typing(typing) => Self::TypingReceived(typing),
            Envelope::Presence(snapshot) => Self::PresenceChanged(snapshot),
        }
    }
}
