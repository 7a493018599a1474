//! Per-connection gateway.
//!
//! One gateway runs per upgraded WebSocket. It subscribes the user to their
//! own channel and to the presence channel, marks them online, then runs four
//! futures until the first one finishes:
//!
//! - inbox relay: forwards everything published on the user's channel;
//! - presence relay: on every presence broadcast, re-reads the online set and
//!   forwards it minus the user's own id;
//! - keepalive: pings the client at a fixed interval;
//! - inbound loop: reads client envelopes and republishes chat and typing
//!   messages, unmodified, on the addressee's channel. Gives up when nothing
//!   arrives within the idle timeout.
//!
//! The writers share the socket's write half through a mutex that is held
//! for exactly one send. The inbound loop never writes.
//!
//! A broadcast only says that membership changed. Two announces can reach the
//! channel in the opposite order to the reads that built them, so the
//! broadcast's own snapshot may already be stale when it arrives; reading the
//! registry again makes the last snapshot a client sees reflect the last
//! change.
//!
//! # Lifecycle
//!
//! `Connecting -> Upgraded -> Active -> Closing -> Closed`. Leaving `Active`
//! always runs presence cleanup, whatever ended the session. Cleanup is owned
//! by a [`PresenceGuard`]; if the gateway future is dropped before releasing
//! it (server shutdown, task abort), the guard's `Drop` schedules the same
//! cleanup on the runtime.

use std::{fmt, time::Duration};

use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket},
};
use duet_proto::{Envelope, RawEnvelope, UserId, decode};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{sync::Mutex, time::MissedTickBehavior};

use crate::{Relay, channels::UserChannels, presence::PresenceRegistry, store::Subscription};

/// Default interval between keepalive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Default time a connection may stay silent before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Liveness settings for every gateway.
///
/// `idle_timeout` should be a few ping intervals long: a live client answers
/// each ping with a pong, and any inbound frame resets the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    /// Time between pings
    pub ping_interval: Duration,
    /// Silence after which the client is considered gone
    pub idle_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self { ping_interval: DEFAULT_PING_INTERVAL, idle_timeout: DEFAULT_IDLE_TIMEOUT }
    }
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// HTTP request received, not yet upgraded
    Connecting,
    /// WebSocket established, subscriptions being set up
    Upgraded,
    /// Relaying in both directions
    Active,
    /// Tearing down subscriptions and presence
    Closing,
    /// Done
    Closed,
}

impl ConnectionPhase {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Phases only move forward, one step at a time, except that any live
    /// phase may jump straight to `Closing` when setup fails.
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Upgraded)
                | (Self::Upgraded, Self::Active)
                | (Self::Connecting | Self::Upgraded | Self::Active, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Upgraded => "upgraded",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Phase tracker for one connection. Logs every transition.
#[derive(Debug)]
pub struct Connection {
    user: UserId,
    phase: ConnectionPhase,
}

impl Connection {
    /// New connection for `user`, in `Connecting`.
    pub fn new(user: UserId) -> Self {
        tracing::debug!(%user, phase = %ConnectionPhase::Connecting, "connection phase");
        Self { user, phase: ConnectionPhase::Connecting }
    }

    /// Current phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Connected user.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    fn advance(&mut self, next: ConnectionPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.phase
        );
        tracing::debug!(user = %self.user, from = %self.phase, to = %next, "connection phase");
        self.phase = next;
    }
}

/// Why a session ended.
#[derive(Debug)]
enum Termination {
    /// Client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the socket failed.
    ReadFailed(axum::Error),
    /// Writing to the socket failed.
    WriteFailed(axum::Error),
    /// No frame arrived within the idle timeout.
    IdleTimeout(Duration),
    /// A store subscription ended underneath us.
    SubscriptionEnded(&'static str),
}

/// Write half of the socket, shared by the outbound relays.
struct Writer {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl Writer {
    fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink: Mutex::new(sink) }
    }

    async fn send(&self, message: Message) -> Result<(), axum::Error> {
        self.sink.lock().await.send(message).await
    }

    async fn send_text(&self, text: String) -> Result<(), axum::Error> {
        self.send(Message::Text(text.into())).await
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::trace!(error = %e, "close frame not sent");
        }
        if let Err(e) = sink.close().await {
            tracing::trace!(error = %e, "socket close failed");
        }
    }
}

/// Presence entry bound to the lifetime of a gateway.
pub(crate) struct PresenceGuard {
    relay: Option<Relay>,
    user: UserId,
}

impl PresenceGuard {
    /// Mark `user` online and tell every other gateway.
    pub(crate) async fn join(relay: Relay, user: UserId) -> Self {
        relay.registry().join(&user).await;
        announce(&relay).await;
        Self { relay: Some(relay), user }
    }

    /// Mark the user offline and broadcast the new membership.
    ///
    /// If this future is dropped part way, the guard's `Drop` repeats the
    /// cleanup; leave is idempotent so running it twice is harmless.
    pub(crate) async fn release(mut self) {
        if let Some(relay) = &self.relay {
            depart(relay.clone(), self.user.clone()).await;
        }
        self.relay = None;
    }
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        let Some(relay) = self.relay.take() else {
            return;
        };
        let user = self.user.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(%user, "gateway dropped before cleanup, scheduling leave");
                handle.spawn(depart(relay, user));
            },
            Err(_) => tracing::error!(%user, "no runtime to run presence cleanup"),
        }
    }
}

async fn depart(relay: Relay, user: UserId) {
    relay.registry().leave(&user).await;
    announce(&relay).await;
}

/// Publish the current membership on the presence channel.
async fn announce(relay: &Relay) {
    let snapshot = match relay.registry().snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "presence snapshot unavailable, skipping announce");
            return;
        },
    };

    let payload = match Envelope::Presence(snapshot).encode() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode presence snapshot");
            return;
        },
    };

    if let Err(e) = relay.channels().publish_presence(&payload).await {
        tracing::warn!(error = %e, "presence announce failed");
    }
}

/// Drive one upgraded connection to completion.
pub async fn serve(socket: WebSocket, mut conn: Connection, relay: Relay) {
    conn.advance(ConnectionPhase::Upgraded);
    let user = conn.user().clone();

    // Subscribe before joining so this client sees the snapshot that
    // announces its own arrival.
    let subscriptions = match relay.channels().subscribe(&user).await {
        Ok(inbox) => match relay.channels().subscribe_presence().await {
            Ok(presence) => Some((inbox, presence)),
            Err(e) => {
                tracing::error!(%user, error = %e, "presence subscribe failed");
                None
            },
        },
        Err(e) => {
            tracing::error!(%user, error = %e, "inbox subscribe failed");
            None
        },
    };

    let (sink, stream) = socket.split();
    let writer = Writer::new(sink);

    let Some((inbox, presence)) = subscriptions else {
        conn.advance(ConnectionPhase::Closing);
        writer.close().await;
        conn.advance(ConnectionPhase::Closed);
        return;
    };

    let guard = PresenceGuard::join(relay.clone(), user.clone()).await;
    conn.advance(ConnectionPhase::Active);

    let keepalive = relay.keepalive();
    let termination = tokio::select! {
        t = relay_inbox(inbox, &writer) => t,
        t = relay_presence(presence, &user, relay.registry(), &writer) => t,
        t = ping(&writer, keepalive.ping_interval) => t,
        t = read_inbound(stream, &user, relay.channels(), keepalive.idle_timeout) => t,
    };

    conn.advance(ConnectionPhase::Closing);
    match &termination {
        Termination::ClientClosed => tracing::debug!(%user, "client closed connection"),
        Termination::ReadFailed(e) | Termination::WriteFailed(e) => {
            tracing::warn!(%user, error = %e, "connection failed");
        },
        Termination::IdleTimeout(after) => {
            tracing::warn!(%user, ?after, "client silent, dropping connection");
        },
        Termination::SubscriptionEnded(which) => {
            tracing::warn!(%user, subscription = which, "subscription ended");
        },
    }

    guard.release().await;
    writer.close().await;
    conn.advance(ConnectionPhase::Closed);
}

async fn relay_inbox(mut inbox: Subscription, writer: &Writer) -> Termination {
    while let Some(payload) = inbox.next().await {
        if let Err(e) = writer.send_text(payload).await {
            return Termination::WriteFailed(e);
        }
    }
    Termination::SubscriptionEnded("inbox")
}

async fn relay_presence(
    mut updates: Subscription,
    user: &UserId,
    registry: &PresenceRegistry,
    writer: &Writer,
) -> Termination {
    while let Some(payload) = updates.next().await {
        let broadcast = match decode(&payload).and_then(RawEnvelope::into_envelope) {
            Ok(Some(Envelope::Presence(snapshot))) => snapshot,
            Ok(_) => {
                tracing::warn!("non-presence message on presence channel");
                continue;
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed presence broadcast");
                continue;
            },
        };

        let snapshot = match registry.snapshot().await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(%user, error = %e, "presence re-read failed, forwarding broadcast");
                broadcast
            },
        };

        let text = match Envelope::Presence(snapshot.without(user)).encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode presence for client");
                continue;
            },
        };

        if let Err(e) = writer.send_text(text).await {
            return Termination::WriteFailed(e);
        }
    }
    Termination::SubscriptionEnded("presence")
}

async fn ping(writer: &Writer, every: Duration) -> Termination {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = writer.send(Message::Ping(Bytes::new())).await {
            return Termination::WriteFailed(e);
        }
    }
}

async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    user: &UserId,
    channels: &UserChannels,
    idle_timeout: Duration,
) -> Termination {
    loop {
        let frame = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Termination::ClientClosed,
            Err(_) => return Termination::IdleTimeout(idle_timeout),
        };
        match frame {
            Ok(Message::Text(text)) => route(text.as_str(), user, channels).await,
            Ok(Message::Close(_)) => return Termination::ClientClosed,
            Ok(Message::Binary(_)) => tracing::debug!(%user, "ignoring binary frame"),
            Ok(Message::Ping(_) | Message::Pong(_)) => {},
            Err(e) => return Termination::ReadFailed(e),
        }
    }
}

/// Republish one client envelope on its addressee's channel.
///
/// Only the routing field is read; the original text is forwarded as-is.
async fn route(text: &str, sender: &UserId, channels: &UserChannels) {
    let envelope = match decode(text).and_then(RawEnvelope::into_envelope) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => {
            tracing::debug!(user = %sender, "ignoring envelope of unknown kind");
            return;
        },
        Err(e) => {
            tracing::warn!(user = %sender, error = %e, "dropping malformed envelope");
            return;
        },
    };

    let Some(to) = envelope.recipient() else {
        tracing::debug!(user = %sender, kind = %envelope.kind(), "ignoring unroutable envelope");
        return;
    };

    if let Err(e) = channels.publish(to, text).await {
        tracing::warn!(user = %sender, %to, error = %e, "publish failed");
    }
}
