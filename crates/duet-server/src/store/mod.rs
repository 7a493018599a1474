//! Presence store abstraction.
//!
//! The relay keeps no cross-connection state of its own. Presence membership
//! and message fan-out both live behind [`PresenceStore`], a narrow set +
//! pub/sub interface. Running several relays against one shared backend (see
//! `RedisStore`) gives globally consistent presence without any replication
//! between relay processes.
//!
//! Subscriptions are established eagerly: once [`PresenceStore::subscribe`]
//! returns, every later publish on that channel is observed by the returned
//! stream. Publishes made before that point are not replayed.

mod chaotic;
mod memory;
#[cfg(feature = "redis")]
mod redis;

use async_trait::async_trait;
pub use chaotic::ChaoticStore;
use futures::stream::BoxStream;
pub use memory::MemoryStore;
use thiserror::Error;

#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Live feed of payloads published on one channel.
///
/// Ends only if the backend closes the channel. A finished subscription
/// cannot be resumed; subscribe again instead.
pub type Subscription = BoxStream<'static, String>;

/// Errors from a presence store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Failure injected by [`ChaoticStore`].
    #[error("injected fault during {operation}")]
    Injected {
        /// Operation that was failed
        operation: &'static str,
    },

    /// Redis command or connection failure.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Set and pub/sub operations the relay needs from shared state.
///
/// All operations are best-effort from the relay's point of view: callers log
/// failures and carry on.
#[async_trait]
pub trait PresenceStore: Send + Sync + 'static {
    /// Add `member` to `set`. Adding an existing member is a no-op.
    async fn add(&self, set: &str, member: &str) -> Result<(), StoreError>;

    /// Remove `member` from `set`. Removing an absent member is a no-op.
    async fn remove(&self, set: &str, member: &str) -> Result<(), StoreError>;

    /// Current members of `set`, in no particular order.
    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Publish `payload` to every current subscriber of `channel`.
    ///
    /// Delivery is at-most-once. With no subscribers the payload is dropped.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;

    /// Subscribe to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;
}
