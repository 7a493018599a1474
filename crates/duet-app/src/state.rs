//! Observable view state.

use duet_proto::UserId;

/// Which screen the client is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Choosing an identity.
    SignIn,
    /// Waiting for the relay to accept the session.
    Connecting,
    /// Picking someone to talk to.
    Friends,
    /// Talking to `peer`.
    Conversation {
        /// The other party
        peer: UserId,
    },
    /// Terminal state; the message is shown until the process exits.
    Exiting {
        /// Farewell or error text
        message: String,
    },
}

impl View {
    /// Peer of the active conversation, if any.
    pub fn peer(&self) -> Option<&UserId> {
        match self {
            Self::Conversation { peer } => Some(peer),
            _ => None,
        }
    }

    /// True once the client is shutting down.
    pub fn is_exiting(&self) -> bool {
        matches!(self, Self::Exiting { .. })
    }
}
