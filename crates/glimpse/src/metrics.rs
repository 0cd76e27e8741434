//! Aggregate load metrics across sessions.
//!
//! [`LoadMetrics`] counts outcomes, either recorded directly or collected
//! from an [`EventBus`] by [`LoadMetrics::attach`].

use std::{sync::Arc, time::Duration};

use glimpse_events::{Event, EventBus, LoadEvent};
use parking_lot::Mutex;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Point-in-time totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Settled attempts, successful or not.
    pub total: u64,
    pub loaded: u64,
    pub failed: u64,
    /// Sum of load durations of successful attempts.
    pub total_load_time: Duration,
}

impl MetricsSnapshot {
    /// Mean load duration over successful attempts; zero before the first.
    pub fn average_load_time(&self) -> Duration {
        match u32::try_from(self.loaded).unwrap_or(u32::MAX) {
            0 => Duration::ZERO,
            n => self.total_load_time / n,
        }
    }
}

/// Shared, cheaply cloned metrics accumulator.
#[derive(Clone, Debug, Default)]
pub struct LoadMetrics {
    inner: Arc<Mutex<MetricsSnapshot>>,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_loaded(&self, elapsed: Duration) {
        let mut m = self.inner.lock();
        m.total += 1;
        m.loaded += 1;
        m.total_load_time += elapsed;
    }

    pub fn record_failed(&self) {
        let mut m = self.inner.lock();
        m.total += 1;
        m.failed += 1;
    }

    /// Record `event` if it settles an attempt. Other events are ignored.
    pub fn record(&self, event: &Event) {
        match event {
            Event::Load(LoadEvent::Loaded { elapsed, .. }) => self.record_loaded(*elapsed),
            Event::Load(LoadEvent::Errored { .. }) => self.record_failed(),
            _ => {}
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.inner.lock()
    }

    pub fn reset(&self) {
        *self.inner.lock() = MetricsSnapshot::default();
    }

    /// Collect from `bus` on a background task until `cancel` fires or the
    /// bus closes. Must be called within a Tokio runtime.
    pub fn attach(&self, bus: &EventBus, cancel: CancellationToken) -> JoinHandle<()> {
        let metrics = self.clone();
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(event) => metrics.record(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "metrics fell behind the event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            trace!("metrics collector stopped");
        })
    }
}
