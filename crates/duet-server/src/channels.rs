//! Per-user channels.
//!
//! Each user has a channel named after their id carrying the chat and typing
//! envelopes addressed to them, plus everyone listens on the global presence
//! channel. Payloads are opaque strings here: the gateway hands over the exact
//! text a client sent, and subscribers get it back byte for byte.
//!
//! Delivery is best-effort and FIFO per channel. Nothing is queued for a user
//! with no live subscription.

use std::sync::Arc;

use duet_proto::{PRESENCE_CHANNEL, UserId};

use crate::store::{PresenceStore, StoreError, Subscription};

/// Publish/subscribe access to user channels.
#[derive(Clone)]
pub struct UserChannels {
    store: Arc<dyn PresenceStore>,
}

impl UserChannels {
    /// Channels over `store`.
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self { store }
    }

    /// Deliver `payload` to whoever is subscribed to `user`'s channel.
    pub async fn publish(&self, user: &UserId, payload: &str) -> Result<(), StoreError> {
        self.store.publish(user.as_str(), payload).await
    }

    /// Messages addressed to `user` from now on.
    pub async fn subscribe(&self, user: &UserId) -> Result<Subscription, StoreError> {
        self.store.subscribe(user.as_str()).await
    }

    /// Broadcast an encoded presence envelope to every gateway.
    pub async fn publish_presence(&self, payload: &str) -> Result<(), StoreError> {
        self.store.publish(PRESENCE_CHANNEL, payload).await
    }

    /// Presence broadcasts from now on.
    pub async fn subscribe_presence(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(PRESENCE_CHANNEL).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::store::MemoryStore;

    fn id(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn channels() -> UserChannels {
        UserChannels::new(Arc::new(MemoryStore::new()))
    }

    async fn try_next(sub: &mut Subscription) -> Option<String> {
        tokio::time::timeout(Duration::from_millis(100), sub.next()).await.ok().flatten()
    }

    #[tokio::test]
    async fn message_reaches_only_its_addressee() {
        let channels = channels();
        let mut alice = channels.subscribe(&id("alice")).await.unwrap();
        let mut bob = channels.subscribe(&id("bob")).await.unwrap();
        let mut presence = channels.subscribe_presence().await.unwrap();

        channels.publish(&id("bob"), "for bob").await.unwrap();

        assert_eq!(try_next(&mut bob).await.as_deref(), Some("for bob"));
        assert_eq!(try_next(&mut alice).await, None);
        assert_eq!(try_next(&mut presence).await, None);
    }

    #[tokio::test]
    async fn delivery_follows_publish_order() {
        let channels = channels();
        let mut bob = channels.subscribe(&id("bob")).await.unwrap();

        let sent: Vec<String> = (0..50).map(|i| format!("e{i}")).collect();
        for payload in &sent {
            channels.publish(&id("bob"), payload).await.unwrap();
        }

        let mut received = Vec::new();
        for _ in 0..sent.len() {
            received.push(try_next(&mut bob).await.unwrap());
        }
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn payload_is_not_rewritten() {
        let channels = channels();
        let mut bob = channels.subscribe(&id("bob")).await.unwrap();
        let text = r#"{"type":"chat", "value":{"to":"bob","from":"alice","text":"  hi ","color":9}}"#;

        channels.publish(&id("bob"), text).await.unwrap();

        assert_eq!(try_next(&mut bob).await.as_deref(), Some(text));
    }

    #[tokio::test]
    async fn resubscribing_does_not_replay() {
        let channels = channels();
        let first = channels.subscribe(&id("bob")).await.unwrap();
        channels.publish(&id("bob"), "old").await.unwrap();
        drop(first);

        let mut second = channels.subscribe(&id("bob")).await.unwrap();
        channels.publish(&id("bob"), "new").await.unwrap();

        assert_eq!(try_next(&mut second).await.as_deref(), Some("new"));
    }
}
