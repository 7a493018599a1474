//! Typing heartbeat coordinator.
//!
//! At most one heartbeat is live per client. Each qualifying keystroke
//! replaces it: the old scope's token is cancelled and a new scope with a
//! fresh generation starts a quiet-window timer. When a timer fires it reports
//! its generation; [`TypingCoordinator::expire`] only honours the current
//! one, so a superseded timer can never publish `isTyping: false`, even if it
//! fired just before being cancelled.
//!
//! Only the first keystroke of a burst yields `isTyping: true`. Restarts
//! within the window extend the burst silently, so a burst of N keystrokes
//! produces one `true` and, once the window elapses after the last keystroke,
//! one `false`.

use std::time::Duration;

use duet_proto::TypingEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Quiet window after the last keystroke before "stopped typing" is sent.
pub const DEFAULT_TYPING_WINDOW: Duration = Duration::from_secs(3);

struct Scope {
    generation: u64,
    token: CancellationToken,
    template: TypingEvent,
}

/// Single-flight typing heartbeat.
///
/// Timers run as spawned tasks, so the coordinator must be used inside a
/// Tokio runtime.
pub struct TypingCoordinator {
    window: Duration,
    scope: Option<Scope>,
    generation: u64,
    expired_tx: mpsc::UnboundedSender<u64>,
    expired_rx: mpsc::UnboundedReceiver<u64>,
}

impl TypingCoordinator {
    /// Coordinator with the given quiet window.
    pub fn new(window: Duration) -> Self {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        Self { window, scope: None, generation: 0, expired_tx, expired_rx }
    }

    /// Quiet window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// True while a heartbeat is live.
    pub fn is_active(&self) -> bool {
        self.scope.is_some()
    }

    /// Generation of the live heartbeat, if any.
    pub fn generation(&self) -> Option<u64> {
        self.scope.as_ref().map(|scope| scope.generation)
    }

    /// Restart the heartbeat for the conversation in `template`.
    ///
    /// Returns the `isTyping: true` event to publish when this starts a new
    /// burst (nothing live, or the live heartbeat was for another peer).
    pub fn restart(&mut self, template: TypingEvent) -> Option<TypingEvent> {
        let continuing = self.scope.as_ref().is_some_and(|scope| scope.template.to == template.to);
        if let Some(previous) = self.scope.take() {
            previous.token.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.spawn_timer(generation, token.clone());

        let started = template.with_state(true);
        self.scope = Some(Scope { generation, token, template: started.clone() });
        tracing::trace!(generation, continuing, "typing heartbeat restarted");

        (!continuing).then_some(started)
    }

    /// Cancel the live heartbeat without publishing. Returns `true` if one
    /// was live.
    pub fn cancel(&mut self) -> bool {
        match self.scope.take() {
            Some(scope) => {
                scope.token.cancel();
                tracing::trace!(generation = scope.generation, "typing heartbeat cancelled");
                true
            },
            None => false,
        }
    }

    /// Wait for some timer to fire. Yields the timer's generation.
    ///
    /// Cancel-safe: a generation is only consumed when it is returned.
    pub async fn expired(&mut self) -> u64 {
        match self.expired_rx.recv().await {
            Some(generation) => generation,
            // Unreachable while we hold the sender
            None => std::future::pending().await,
        }
    }

    /// Handle an expired timer.
    ///
    /// Returns the `isTyping: false` event to publish if `generation` is the
    /// live heartbeat; stale generations are ignored.
    pub fn expire(&mut self, generation: u64) -> Option<TypingEvent> {
        if self.generation() != Some(generation) {
            tracing::trace!(generation, "ignoring stale typing timer");
            return None;
        }
        self.scope.take().map(|scope| scope.template.with_state(false))
    }

    fn spawn_timer(&self, generation: u64, token: CancellationToken) {
        let window = self.window;
        let tx = self.expired_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {},
                () = tokio::time::sleep(window) => {
                    let _ = tx.send(generation);
                },
            }
        });
    }
}

impl Default for TypingCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_WINDOW)
    }
}

impl Drop for TypingCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use duet_proto::UserId;
    use tokio::time::{Instant, sleep, timeout};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(3);

    fn template(to: &str) -> TypingEvent {
        TypingEvent {
            is_typing: true,
            to: UserId::parse(to).unwrap(),
            color: 12,
            from: UserId::parse("alice").unwrap(),
        }
    }

    async fn next_false(typing: &mut TypingCoordinator) -> Option<TypingEvent> {
        let generation = timeout(Duration::from_secs(60), typing.expired()).await.ok()?;
        typing.expire(generation)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_publishes_one_true_and_one_false() {
        let mut typing = TypingCoordinator::new(WINDOW);
        let start = Instant::now();

        let mut trues = 0;
        for _ in 0..3 {
            if typing.restart(template("bob")).is_some() {
                trues += 1;
            }
            sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(trues, 1);

        let stopped = next_false(&mut typing).await.unwrap();
        assert!(!stopped.is_typing);
        assert_eq!(stopped.to.as_str(), "bob");
        // Last keystroke at t=2s, window 3s.
        assert_eq!(start.elapsed().as_secs(), 5);

        assert!(timeout(Duration::from_secs(30), typing.expired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_false() {
        let mut typing = TypingCoordinator::new(WINDOW);
        typing.restart(template("bob"));

        assert!(typing.cancel());
        assert!(!typing.is_active());
        assert!(timeout(Duration::from_secs(30), typing.expired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_ignored() {
        let mut typing = TypingCoordinator::new(WINDOW);
        typing.restart(template("bob"));
        let first = typing.generation().unwrap();
        typing.restart(template("bob"));

        assert_eq!(typing.expire(first), None);
        assert!(typing.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn new_burst_after_expiry_sends_true_again() {
        let mut typing = TypingCoordinator::new(WINDOW);
        assert!(typing.restart(template("bob")).is_some());
        next_false(&mut typing).await.unwrap();

        assert!(typing.restart(template("bob")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn switching_peer_starts_new_burst() {
        let mut typing = TypingCoordinator::new(WINDOW);
        assert!(typing.restart(template("bob")).is_some());
        let started = typing.restart(template("carol")).unwrap();

        assert_eq!(started.to.as_str(), "carol");
        assert!(started.is_typing);
    }
}
