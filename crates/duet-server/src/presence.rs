//! Presence registry.
//!
//! The set of users with a live gateway, kept in the shared store under a
//! single key. `join` and `leave` never fail from the caller's point of view:
//! a store error is logged and the operation becomes a no-op. Presence may
//! then be stale until the next successful call.

use std::{collections::BTreeSet, sync::Arc};

use duet_proto::{PresenceSnapshot, UserId};

use crate::store::{PresenceStore, StoreError};

/// Store key holding the online set.
pub const ACTIVE_SET: &str = "active:channels";

/// Shared registry of connected users.
#[derive(Clone)]
pub struct PresenceRegistry {
    store: Arc<dyn PresenceStore>,
}

impl PresenceRegistry {
    /// Registry over `store`.
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self { store }
    }

    /// Mark `id` as online. Idempotent.
    pub async fn join(&self, id: &UserId) {
        match self.store.add(ACTIVE_SET, id.as_str()).await {
            Ok(()) => tracing::debug!(user = %id, "presence join"),
            Err(e) => tracing::warn!(user = %id, error = %e, "presence join failed"),
        }
    }

    /// Mark `id` as offline. Idempotent.
    pub async fn leave(&self, id: &UserId) {
        match self.store.remove(ACTIVE_SET, id.as_str()).await {
            Ok(()) => tracing::debug!(user = %id, "presence leave"),
            Err(e) => tracing::warn!(user = %id, error = %e, "presence leave failed"),
        }
    }

    /// Everyone currently online.
    pub async fn list(&self) -> Result<BTreeSet<UserId>, StoreError> {
        let members = self.store.members(ACTIVE_SET).await?;
        Ok(members
            .into_iter()
            .filter_map(|member| match UserId::parse(member) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping invalid presence entry");
                    None
                },
            })
            .collect())
    }

    /// Full membership as a snapshot, sorted by id.
    pub async fn snapshot(&self) -> Result<PresenceSnapshot, StoreError> {
        Ok(PresenceSnapshot(self.list().await?.into_iter().collect()))
    }
}
