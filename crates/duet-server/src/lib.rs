//! duet relay server.
//!
//! Accepts one WebSocket per user at `/chat/{id}`, keeps a shared online set,
//! and routes chat and typing envelopes between the two parties of each
//! conversation.
//!
//! # Components
//!
//! - [`PresenceStore`]: injected set + pub/sub backend ([`MemoryStore`],
//!   `RedisStore` with the `redis` feature, [`ChaoticStore`] for fault
//!   injection)
//! - [`PresenceRegistry`]: who is online
//! - [`UserChannels`]: per-user and global presence channels
//! - [`gateway`]: per-connection coordinator
//! - [`Server`]: HTTP listener and router

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channels;
pub mod config;
mod error;
pub mod gateway;
pub mod presence;
pub mod store;

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
pub use channels::UserChannels;
pub use config::{Config, ConfigError, RedisConfig, StoreKind};
use duet_proto::UserId;
pub use error::ServerError;
pub use gateway::{Connection, ConnectionPhase, Keepalive};
pub use presence::{ACTIVE_SET, PresenceRegistry};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{ChaoticStore, MemoryStore, PresenceStore, StoreError, Subscription};
use tokio::net::TcpListener;

/// Shared relay state handed to every connection.
#[derive(Clone)]
pub struct Relay {
    registry: PresenceRegistry,
    channels: UserChannels,
    keepalive: Keepalive,
}

impl Relay {
    /// Relay state over `store`.
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self {
            registry: PresenceRegistry::new(Arc::clone(&store)),
            channels: UserChannels::new(store),
            keepalive: Keepalive::default(),
        }
    }

    /// Replace the liveness settings used by new connections.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: Keepalive) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Online set.
    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Message channels.
    pub fn channels(&self) -> &UserChannels {
        &self.channels
    }

    /// Liveness settings.
    pub fn keepalive(&self) -> Keepalive {
        self.keepalive
    }
}

/// Build the presence store selected by `config`.
pub async fn connect_store(config: &Config) -> Result<Arc<dyn PresenceStore>, ServerError> {
    config.validate()?;
    match config.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "redis")]
        StoreKind::Redis => Ok(Arc::new(RedisStore::connect(&config.redis()?).await?)),
        #[cfg(not(feature = "redis"))]
        StoreKind::Redis => Err(ConfigError::Unsupported(StoreKind::Redis).into()),
    }
}

/// Routes served by the relay.
///
/// - `GET /chat/{id}`: WebSocket session for user `id`
/// - `GET /chat/`, `GET /chat`: 400, no id
/// - `GET /health`: liveness check
pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/chat/{id}", get(chat))
        .route("/chat/", get(missing_id))
        .route("/chat", get(missing_id))
        .route("/health", get(health))
        .with_state(relay)
}

async fn chat(
    State(relay): State<Relay>,
    Path(raw_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match UserId::parse(raw_id) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting connection");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        },
    };

    let conn = Connection::new(user);
    ws.on_upgrade(move |socket| gateway::serve(socket, conn, relay))
}

async fn missing_id() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "No id")
}

async fn health() -> &'static str {
    "Healthy"
}

/// Relay server bound to a listening socket.
pub struct Server {
    listener: TcpListener,
    relay: Relay,
}

impl Server {
    /// Bind to `addr` serving presence from `store`.
    pub async fn bind(addr: &str, store: Arc<dyn PresenceStore>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.to_owned(), source })?;
        Ok(Self { listener, relay: Relay::new(store) })
    }

    /// Ping and idle-timeout settings for every connection.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: Keepalive) -> Self {
        self.relay = self.relay.with_keepalive(keepalive);
        self
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared relay state.
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then stop accepting connections.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("relay listening on {}", self.local_addr()?);
        axum::serve(self.listener, router(self.relay)).with_graceful_shutdown(shutdown).await?;
        tracing::info!("relay stopped");
        Ok(())
    }
}
