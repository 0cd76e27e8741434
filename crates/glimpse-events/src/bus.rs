use tokio::sync::broadcast;

use crate::Event;

/// Shared event bus for load sessions and the prober.
///
/// `publish()` is sync and works from async tasks and blocking threads alike.
/// With no subscribers, events are dropped.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish anything convertible into [`Event`], e.g.
    /// `bus.publish(ProbeEvent::Resolved { supported: true })`.
    pub fn publish<E: Into<Event>>(&self, event: E) {
        let _ = self.tx.send(event.into());
    }

    /// Subscribe to all future events. Slow subscribers see
    /// `RecvError::Lagged(n)` rather than blocking producers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
