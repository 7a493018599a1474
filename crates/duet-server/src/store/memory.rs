//! In-process presence store.
//!
//! Sets are plain hash sets and every channel is a `tokio::sync::broadcast`
//! sender. Suitable for a single relay instance and for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock, broadcast, broadcast::error::RecvError};

use super::{PresenceStore, StoreError, Subscription};

/// Per-channel buffer before slow subscribers start lagging.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// In-memory [`PresenceStore`].
///
/// Clones share the same state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    sets: Mutex<HashMap<String, HashSet<String>>>,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty store whose channels buffer `capacity` messages per
    /// subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                sets: Mutex::new(HashMap::new()),
                channels: RwLock::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Number of live subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.inner.channels.read().await.get(channel).map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop the sender for `channel` if nobody listens any more.
    async fn prune(&self, channel: &str) {
        let mut channels = self.inner.channels.write().await;
        if channels.get(channel).is_some_and(|tx| tx.receiver_count() == 0) {
            channels.remove(channel);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        let mut sets = self.inner.sets.lock().await;
        sets.entry(set.to_owned()).or_default().insert(member.to_owned());
        Ok(())
    }

    async fn remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        let mut sets = self.inner.sets.lock().await;
        if let Some(members) = sets.get_mut(set) {
            members.remove(member);
            if members.is_empty() {
                sets.remove(set);
            }
        }
        Ok(())
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let sets = self.inner.sets.lock().await;
        Ok(sets.get(set).map(|members| members.iter().cloned().collect()).unwrap_or_default())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let delivered = {
            let channels = self.inner.channels.read().await;
            match channels.get(channel) {
                Some(tx) => tx.send(payload.to_owned()).is_ok(),
                None => return Ok(()),
            }
        };

        if !delivered {
            tracing::trace!(channel, "no subscribers, dropping payload");
            self.prune(channel).await;
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let rx = {
            let mut channels = self.inner.channels.write().await;
            channels
                .entry(channel.to_owned())
                .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
                .subscribe()
        };

        let channel = channel.to_owned();
        let stream = futures::stream::unfold(rx, move |mut rx| {
            let channel = channel.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(payload) => return Some((payload, rx)),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(%channel, skipped, "subscriber lagged, messages lost");
                        },
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn next(sub: &mut Subscription) -> Option<String> {
        tokio::time::timeout(Duration::from_millis(200), sub.next()).await.ok().flatten()
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let store = MemoryStore::new();
        store.add("set", "alice").await.unwrap();
        store.add("set", "alice").await.unwrap();

        assert_eq!(store.members("set").await.unwrap(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn remove_absent_is_noop() {
        let store = MemoryStore::new();
        store.remove("set", "ghost").await.unwrap();
        store.add("set", "alice").await.unwrap();
        store.remove("set", "ghost").await.unwrap();

        assert_eq!(store.members("set").await.unwrap(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_lost() {
        let store = MemoryStore::new();
        store.publish("bob", "early").await.unwrap();

        let mut sub = store.subscribe("bob").await.unwrap();
        store.publish("bob", "late").await.unwrap();

        assert_eq!(next(&mut sub).await.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn every_subscriber_sees_each_publish() {
        let store = MemoryStore::new();
        let mut first = store.subscribe("all").await.unwrap();
        let mut second = store.subscribe("all").await.unwrap();

        store.publish("all", "x").await.unwrap();

        assert_eq!(next(&mut first).await.as_deref(), Some("x"));
        assert_eq!(next(&mut second).await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn dropped_subscription_prunes_channel() {
        let store = MemoryStore::new();
        let sub = store.subscribe("bob").await.unwrap();
        assert_eq!(store.subscriber_count("bob").await, 1);

        drop(sub);
        store.publish("bob", "nobody home").await.unwrap();

        assert_eq!(store.subscriber_count("bob").await, 0);
        assert!(store.inner.channels.read().await.get("bob").is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let store = MemoryStore::with_capacity(2);
        let mut sub = store.subscribe("bob").await.unwrap();

        for i in 0..5 {
            store.publish("bob", &i.to_string()).await.unwrap();
        }

        assert_eq!(next(&mut sub).await.as_deref(), Some("3"));
        assert_eq!(next(&mut sub).await.as_deref(), Some("4"));
    }
}
