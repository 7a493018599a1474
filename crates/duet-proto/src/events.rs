//! Event payloads carried inside envelopes.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// 256-colour palette index chosen by each client for its own lines.
pub type ColorTag = i32;

/// A chat line sent from one user to another.
///
/// Immutable once built. The relay never reads `text`; it routes on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Addressee
    pub to: UserId,
    /// Sender
    pub from: UserId,
    /// Message body
    pub text: String,
    /// Sender's colour
    pub color: ColorTag,
}

/// A "started/stopped typing" signal.
///
/// Transient: there is no delivery or ordering guarantee beyond the FIFO
/// order of the addressee's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    /// `true` while the sender is typing
    pub is_typing: bool,
    /// Addressee
    pub to: UserId,
    /// Sender's colour
    pub color: ColorTag,
    /// Sender
    pub from: UserId,
}

impl TypingEvent {
    /// Same conversation and colour with a different typing state.
    pub fn with_state(&self, is_typing: bool) -> Self {
        Self { is_typing, ..self.clone() }
    }
}

/// Users currently online.
///
/// The relay stores the full membership; each connection strips its own id
/// with [`PresenceSnapshot::without`] before forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresenceSnapshot(pub Vec<UserId>);

impl PresenceSnapshot {
    /// Snapshot with `id` removed, order preserved.
    pub fn without(&self, id: &UserId) -> Self {
        Self(self.0.iter().filter(|member| *member != id).cloned().collect())
    }

    /// Members in snapshot order.
    pub fn members(&self) -> &[UserId] {
        &self.0
    }

    /// Whether `id` is listed.
    pub fn contains(&self, id: &UserId) -> bool {
        self.0.contains(id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nobody is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<UserId>> for PresenceSnapshot {
    fn from(members: Vec<UserId>) -> Self {
        Self(members)
    }
}
