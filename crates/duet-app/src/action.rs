//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use duet_proto::{ChatEvent, TypingEvent, UserId};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Close the connection, wait out the grace period, and exit.
    Quit,

    /// Open a session on the relay.
    Connect {
        /// Identity to sign in as.
        user: UserId,
    },

    /// Publish a chat line. Echoed locally once the send succeeds.
    SendChat(ChatEvent),

    /// A content keystroke in a conversation: (re)start the heartbeat.
    ///
    /// The event is the `isTyping: true` template for the conversation.
    RestartTyping(TypingEvent),

    /// Cancel the heartbeat and publish this `isTyping: false` event.
    StopTyping(TypingEvent),

    /// Cancel the heartbeat without publishing anything.
    CancelTyping,
}
