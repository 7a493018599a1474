//! User identifiers.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

use crate::IdError;

/// Name of the global channel carrying presence snapshots.
///
/// User channels share a namespace with it, so no user may be called this.
pub const PRESENCE_CHANNEL: &str = "all";

/// Opaque identifier of a connected user.
///
/// Used both as a presence-set member and as the name of the user's channel.
/// Values read off the wire are taken as-is; [`UserId::parse`] is the checked
/// constructor used at the edges where identifiers are chosen (request paths,
/// the sign-in prompt).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap an identifier.
    ///
    /// Rejects empty strings, whitespace, `/`, and the reserved presence
    /// channel name.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::Empty);
        }
        if raw == PRESENCE_CHANNEL {
            return Err(IdError::Reserved(raw));
        }
        if let Some(c) = raw.chars().find(|c| *c == '/' || c.is_whitespace() || c.is_control()) {
            return Err(IdError::InvalidChar(c));
        }
        Ok(Self(raw))
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UserId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}
