//! Fault-injecting store wrapper.
//!
//! Delegates to an inner store but fails a configurable fraction of calls.
//! Used to check that presence and routing degrade to no-ops instead of
//! tearing connections down when the backend misbehaves.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::{PresenceStore, StoreError, Subscription};

/// Store wrapper that randomly fails operations.
///
/// Failures are drawn from a seeded generator, so a given seed and call
/// sequence always fails the same calls. Clones share the generator, the
/// counter and the failure rate, so a test can keep one clone and turn faults
/// on and off while the relay holds another.
#[derive(Clone)]
pub struct ChaoticStore<S> {
    inner: S,
    /// Failure rate as `f64` bits (0.0 = never fail, 1.0 = always fail)
    failure_rate: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaoticRng>>,
    operation_count: Arc<AtomicUsize>,
}

/// Linear congruential generator. Fast and reproducible, nothing more.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: PresenceStore> ChaoticStore<S> {
    /// Wrap `inner`, failing roughly `failure_rate` of all calls.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x5EED_D0E7_0000_0001)
    }

    /// Wrap with an explicit seed for reproducible runs.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        check_rate(failure_rate);

        Self {
            inner,
            failure_rate: Arc::new(AtomicU64::new(failure_rate.to_bits())),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Change the failure rate for every clone of this store.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn set_failure_rate(&self, failure_rate: f64) {
        check_rate(failure_rate);
        self.failure_rate.store(failure_rate.to_bits(), Ordering::Relaxed);
    }

    /// Current failure rate.
    pub fn failure_rate(&self) -> f64 {
        f64::from_bits(self.failure_rate.load(Ordering::Relaxed))
    }

    /// Wrapped store, for checking state after a chaotic run.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total calls attempted, failed or not.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    fn roll(&self, operation: &'static str) -> Result<(), StoreError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);
        let draw = self.rng.lock().unwrap_or_else(PoisonError::into_inner).next();
        if draw < self.failure_rate() {
            tracing::debug!(operation, "injecting store fault");
            return Err(StoreError::Injected { operation });
        }
        Ok(())
    }
}

fn check_rate(failure_rate: f64) {
    assert!(
        (0.0..=1.0).contains(&failure_rate),
        "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
    );
}

#[async_trait]
impl<S: PresenceStore> PresenceStore for ChaoticStore<S> {
    async fn add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.roll("add")?;
        self.inner.add(set, member).await
    }

    async fn remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.roll("remove")?;
        self.inner.remove(set, member).await
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        self.roll("members")?;
        self.inner.members(set).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        self.roll("publish")?;
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        self.roll("subscribe")?;
        self.inner.subscribe(channel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn zero_rate_never_fails() {
        let store = ChaoticStore::new(MemoryStore::new(), 0.0);
        for _ in 0..100 {
            store.add("set", "alice").await.unwrap();
        }
        assert_eq!(store.operation_count(), 100);
    }

    #[tokio::test]
    async fn full_rate_always_fails_without_touching_inner() {
        let store = ChaoticStore::new(MemoryStore::new(), 1.0);
        let err = store.add("set", "alice").await.unwrap_err();

        assert!(matches!(err, StoreError::Injected { operation: "add" }));
        assert!(store.inner().members("set").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_seed_fails_same_calls() {
        let a = ChaoticStore::with_seed(MemoryStore::new(), 0.5, 7);
        let b = ChaoticStore::with_seed(MemoryStore::new(), 0.5, 7);

        for _ in 0..50 {
            let left = a.publish("c", "x").await.is_ok();
            let right = b.publish("c", "x").await.is_ok();
            assert_eq!(left, right);
        }
    }

    #[tokio::test]
    async fn rate_change_reaches_clones() {
        let store = ChaoticStore::with_seed(MemoryStore::new(), 0.0, 11);
        let shared = store.clone();

        shared.set_failure_rate(1.0);
        assert!(store.publish("c", "x").await.is_err());

        shared.set_failure_rate(0.0);
        assert!(store.publish("c", "x").await.is_ok());
        assert_eq!(shared.operation_count(), 2);
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between 0.0 and 1.0")]
    fn rejects_out_of_range_rate() {
        let _ = ChaoticStore::new(MemoryStore::new(), 1.5);
    }
}
