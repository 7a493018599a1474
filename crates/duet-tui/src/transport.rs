//! WebSocket transport for the client.
//!
//! Provides [`Session`], which owns the write half of the relay connection.
//! A reader task decodes everything the relay sends into [`AppEvent`]s and
//! forwards them over a channel the terminal driver polls.

use duet_app::AppEvent;
use duet_proto::{Envelope, ProtocolError, UserId};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The relay could not be reached or refused the upgrade.
    #[error("cannot connect to {url}: {source}")]
    Connect {
        /// Endpoint we dialled
        url: String,
        /// Underlying failure
        #[source]
        source: tungstenite::Error,
    },

    /// Writing to the socket failed.
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// Envelope could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// An open session on the relay.
pub struct Session {
    user: UserId,
    outbound: SplitSink<Socket, Message>,
    reader: JoinHandle<()>,
}

impl Session {
    /// Identity this session was opened as.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Encode and write one envelope.
    pub async fn send(&mut self, envelope: &Envelope) -> Result<(), TransportError> {
        let text = envelope.encode()?;
        self.outbound.send(Message::Text(text.into())).await.map_err(TransportError::Send)
    }

    /// Send a close frame and stop the reader. Failures are logged and
    /// otherwise ignored; the relay treats an abrupt disconnect the same way.
    pub async fn close(mut self) {
        if let Err(e) = self.outbound.send(Message::Close(None)).await {
            tracing::debug!(error = %e, "close frame not sent");
        }
        if let Err(e) = self.outbound.close().await {
            tracing::debug!(error = %e, "socket close failed");
        }
        self.reader.abort();
        tracing::info!(user = %self.user, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Session endpoint for `user` on the relay at `base`.
pub fn endpoint(base: &str, user: &UserId) -> String {
    format!("{}/chat/{user}", base.trim_end_matches('/'))
}

/// Open a session on the relay at `base` (e.g. `ws://127.0.0.1:8080`).
///
/// Everything the relay sends is delivered to `inbound`, ending with a
/// single [`AppEvent::Disconnected`] when the socket closes.
pub async fn connect(
    base: &str,
    user: &UserId,
    inbound: mpsc::Sender<AppEvent>,
) -> Result<Session, TransportError> {
    let url = endpoint(base, user);
    tracing::debug!(%url, "connecting");

    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|source| TransportError::Connect { url: url.clone(), source })?;
    let (outbound, stream) = socket.split();
    let reader = tokio::spawn(read_loop(stream, inbound));

    tracing::info!(%url, "session opened");
    Ok(Session { user: user.clone(), outbound, reader })
}

async fn read_loop(mut stream: SplitStream<Socket>, inbound: mpsc::Sender<AppEvent>) {
    let reason = loop {
        let event = match stream.next().await {
            Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                Some(event) => event,
                None => continue,
            },
            Some(Ok(Message::Close(frame))) => {
                break frame.map(|f| f.reason.as_str().to_owned()).filter(|r| !r.is_empty());
            },
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        };
        if inbound.send(event).await.is_err() {
            // Driver gone; nobody left to tell.
            return;
        }
    };

    tracing::info!(?reason, "relay closed the session");
    if inbound.send(AppEvent::Disconnected { reason }).await.is_err() {
        tracing::debug!("UI loop gone before disconnect was reported");
    }
}

/// Decode one relay message. Malformed and unknown messages are dropped.
fn decode(text: &str) -> Option<AppEvent> {
    let raw = match duet_proto::decode(text) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed message");
            return None;
        },
    };
    let kind = raw.kind().clone();
    match raw.into_envelope() {
        Ok(Some(envelope)) => Some(envelope.into()),
        Ok(None) => {
            tracing::debug!(%kind, "ignoring unknown message kind");
            None
        },
        Err(e) => {
            tracing::warn!(%kind, error = %e, "dropping malformed payload");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_user() {
        let user = UserId::parse("alice").unwrap();
        assert_eq!(endpoint("ws://relay:8080", &user), "ws://relay:8080/chat/alice");
        assert_eq!(endpoint("ws://relay:8080/", &user), "ws://relay:8080/chat/alice");
    }

    #[test]
    fn decode_maps_envelopes_to_events() {
        let chat = decode(r#"{"type":"chat","value":{"to":"alice","from":"bob","text":"hi","color":5}}"#);
        assert!(matches!(chat, Some(AppEvent::ChatReceived(c)) if c.text == "hi"));

        let friends = decode(r#"{"type":"friends","value":["alice","bob"]}"#);
        assert!(matches!(friends, Some(AppEvent::PresenceChanged(s)) if s.len() == 2));

        let typing =
            decode(r#"{"type":"typing","value":{"isTyping":true,"to":"alice","color":5,"from":"bob"}}"#);
        assert!(matches!(typing, Some(AppEvent::TypingReceived(t)) if t.is_typing));
    }

    #[test]
    fn decode_drops_garbage() {
        assert!(decode("not json").is_none());
        assert!(decode(r#"{"type":"chat","value":42}"#).is_none());
        assert!(decode(r#"{"type":"wave","value":{}}"#).is_none());
    }
}
