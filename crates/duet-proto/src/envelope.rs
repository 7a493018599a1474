//! Tagged envelope codec.
//!
//! Encoding goes straight from the closed [`Envelope`] sum type. Decoding is
//! two-phase: [`decode`] validates the framing and keeps the payload as raw
//! JSON, so the relay can route a message by reading only its `to` field and
//! then republish the original text untouched.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::value::RawValue;

use crate::{ChatEvent, PresenceSnapshot, ProtocolError, Result, TypingEvent, UserId};

/// A complete, typed protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Envelope {
    /// Chat line
    #[serde(rename = "chat")]
    Chat(ChatEvent),
    /// Typing state change
    #[serde(rename = "typing")]
    Typing(TypingEvent),
    /// Online users, as seen by the recipient
    #[serde(rename = "friends")]
    Presence(PresenceSnapshot),
}

impl Envelope {
    /// Serialize to the JSON wire form.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encoding)
    }

    /// Kind discriminator of this envelope.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Chat(_) => Kind::Chat,
            Self::Typing(_) => Kind::Typing,
            Self::Presence(_) => Kind::Presence,
        }
    }

    /// Addressee for user-to-user messages. `None` for presence snapshots,
    /// which are never routed by recipient.
    pub fn recipient(&self) -> Option<&UserId> {
        match self {
            Self::Chat(chat) => Some(&chat.to),
            Self::Typing(typing) => Some(&typing.to),
            Self::Presence(_) => None,
        }
    }
}

impl From<ChatEvent> for Envelope {
    fn from(event: ChatEvent) -> Self {
        Self::Chat(event)
    }
}

impl From<TypingEvent> for Envelope {
    fn from(event: TypingEvent) -> Self {
        Self::Typing(event)
    }
}

impl From<PresenceSnapshot> for Envelope {
    fn from(snapshot: PresenceSnapshot) -> Self {
        Self::Presence(snapshot)
    }
}

/// Envelope discriminator as read from the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Kind {
    /// `"chat"`
    Chat,
    /// `"typing"`
    Typing,
    /// `"friends"`
    Presence,
    /// Any other tag. Ignored by consumers.
    Unknown(String),
}

impl Kind {
    /// Wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Chat => "chat",
            Self::Typing => "typing",
            Self::Presence => "friends",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for Kind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "chat" => Self::Chat,
            "typing" => Self::Typing,
            "friends" => Self::Presence,
            _ => Self::Unknown(tag),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope with validated framing and an uninterpreted payload.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    kind: Kind,
    value: Box<RawValue>,
}

impl RawEnvelope {
    /// Declared kind.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Payload JSON exactly as received.
    pub fn payload(&self) -> &RawValue {
        &self.value
    }

    /// Decode the payload according to the declared kind.
    ///
    /// Returns `Ok(None)` for unknown kinds so callers can skip them.
    pub fn into_envelope(self) -> Result<Option<Envelope>> {
        let envelope = match &self.kind {
            Kind::Chat => Envelope::Chat(decode_chat(&self.value)?),
            Kind::Typing => Envelope::Typing(decode_typing(&self.value)?),
            Kind::Presence => Envelope::Presence(decode_presence(&self.value)?),
            Kind::Unknown(_) => return Ok(None),
        };
        Ok(Some(envelope))
    }
}

/// Parse the outer `{type, value}` framing.
///
/// # Errors
///
/// [`ProtocolError::Decoding`] if the text is not JSON or either field is
/// missing or mistyped.
pub fn decode(text: &str) -> Result<RawEnvelope> {
    serde_json::from_str(text).map_err(ProtocolError::Decoding)
}

/// Interpret a raw payload as a chat event.
pub fn decode_chat(raw: &RawValue) -> Result<ChatEvent> {
    decode_payload(Kind::Chat, raw)
}

/// Interpret a raw payload as a typing event.
pub fn decode_typing(raw: &RawValue) -> Result<TypingEvent> {
    decode_payload(Kind::Typing, raw)
}

/// Interpret a raw payload as a presence snapshot.
pub fn decode_presence(raw: &RawValue) -> Result<PresenceSnapshot> {
    decode_payload(Kind::Presence, raw)
}

fn decode_payload<T: DeserializeOwned>(kind: Kind, raw: &RawValue) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(|source| ProtocolError::Payload { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn chat_wire_format() {
        let envelope = Envelope::Chat(ChatEvent {
            to: id("bob"),
            from: id("alice"),
            text: "hi".into(),
            color: 33,
        });
        assert_eq!(
            envelope.encode().unwrap(),
            r#"{"type":"chat","value":{"to":"bob","from":"alice","text":"hi","color":33}}"#
        );
    }

    #[test]
    fn presence_wire_format_is_bare_array() {
        let envelope = Envelope::Presence(PresenceSnapshot(vec![id("alice"), id("carol")]));
        assert_eq!(envelope.encode().unwrap(), r#"{"type":"friends","value":["alice","carol"]}"#);
    }

    #[test]
    fn decodes_typing_from_foreign_field_order() {
        let text = r#"{"value":{"from":"alice","color":5,"to":"bob","isTyping":false},"type":"typing"}"#;
        let envelope = decode(text).unwrap().into_envelope().unwrap();
        assert_eq!(
            envelope,
            Some(Envelope::Typing(TypingEvent {
                is_typing: false,
                to: id("bob"),
                color: 5,
                from: id("alice"),
            }))
        );
    }

    #[test]
    fn payload_is_kept_verbatim() {
        let text = r#"{"type":"chat","value":{"to":"bob", "from":"alice","text":"x","color":1}}"#;
        let raw = decode(text).unwrap();
        assert_eq!(raw.payload().get(), r#"{"to":"bob", "from":"alice","text":"x","color":1}"#);
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let raw = decode(r#"{"type":"wave","value":{"at":"bob"}}"#).unwrap();
        assert_eq!(raw.kind(), &Kind::Unknown("wave".into()));
        assert!(raw.into_envelope().unwrap().is_none());
    }

    #[test]
    fn bad_framing_is_decoding_error() {
        for text in ["", "not json", r#"{"type":"chat"}"#, r#"{"value":1}"#, r#"{"type":3,"value":1}"#] {
            assert!(matches!(decode(text), Err(ProtocolError::Decoding(_))), "{text}");
        }
    }

    #[test]
    fn schema_mismatch_is_payload_error() {
        let raw = decode(r#"{"type":"chat","value":{"to":"bob"}}"#).unwrap();
        let err = raw.into_envelope().unwrap_err();
        assert!(matches!(err, ProtocolError::Payload { kind: Kind::Chat, .. }));
        assert!(err.to_string().starts_with("malformed chat payload"));
    }

    #[test]
    fn recipient_reads_to_field() {
        let chat = Envelope::Chat(ChatEvent {
            to: id("bob"),
            from: id("alice"),
            text: String::new(),
            color: 1,
        });
        assert_eq!(chat.recipient(), Some(&id("bob")));
        assert_eq!(Envelope::Presence(PresenceSnapshot::default()).recipient(), None);
    }
}
