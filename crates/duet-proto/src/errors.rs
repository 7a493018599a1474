//! Protocol error types.
//!
//! Codec failures are split by layer so callers can tell a broken frame from a
//! well-framed message whose payload does not match its declared kind. Neither
//! is fatal to a connection: both mean "drop this message and keep reading".

use thiserror::Error;

use crate::Kind;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced by the envelope codec.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// An envelope could not be serialized.
    ///
    /// The event types are plain data, so this only happens on a programming
    /// error.
    #[error("failed to encode envelope: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The outer `{type, value}` framing is malformed.
    #[error("malformed envelope: {0}")]
    Decoding(#[source] serde_json::Error),

    /// The payload does not match the schema of its declared kind.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        /// Kind named by the envelope
        kind: Kind,
        /// Underlying schema mismatch
        #[source]
        source: serde_json::Error,
    },
}

/// Reasons a string is rejected as a user identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Identifier is empty.
    #[error("user id is empty")]
    Empty,

    /// Identifier collides with the global presence channel.
    #[error("user id {0:?} is reserved")]
    Reserved(String),

    /// Identifier contains a character that cannot appear in a path segment.
    #[error("user id contains invalid character {0:?}")]
    InvalidChar(char),
}
