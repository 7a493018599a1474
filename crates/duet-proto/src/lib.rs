//! Wire protocol for the duet chat relay.
//!
//! Every message exchanged between a client and the relay is a JSON
//! [`Envelope`]: a `type` discriminator plus a kind-specific `value`. The relay
//! only ever needs the routing fields of an envelope, so decoding is split in
//! two steps. [`decode`] checks the outer framing and yields a
//! [`RawEnvelope`] whose payload is still unparsed; the payload decoders
//! ([`decode_chat`], [`decode_typing`], [`decode_presence`]) then interpret it
//! according to its [`Kind`].
//!
//! # Wire format
//!
//! ```text
//! { "type": "chat",    "value": { "to", "from", "text", "color" } }
//! { "type": "typing",  "value": { "isTyping", "to", "color", "from" } }
//! { "type": "friends", "value": [ "alice", "bob" ] }
//! ```
//!
//! Unknown `type` values decode to [`Kind::Unknown`] and are skipped by
//! consumers rather than treated as errors.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod errors;
mod events;
mod ids;

pub use envelope::{Envelope, Kind, RawEnvelope, decode, decode_chat, decode_presence, decode_typing};
pub use errors::{IdError, ProtocolError, Result};
pub use events::{ChatEvent, ColorTag, PresenceSnapshot, TypingEvent};
pub use ids::{PRESENCE_CHANNEL, UserId};
