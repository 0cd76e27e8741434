//! One-shot "became visible" signals.
//!
//! A [`VisibilityMonitor`] hands out [`VisibilityWatch`]es. A watch resolves at
//! most once, and dropping it detaches it from the monitor so no late signal
//! can reach a torn-down session.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::trace;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VisibilityError {
    #[error("visibility detection unavailable")]
    Unavailable,
}

/// Host-chosen identity of an observed region (one per mounted image).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionId(pub u64);

/// Axis-aligned rectangle in host pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow by `margin` on every side.
    fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        (right >= left && bottom >= top).then(|| Self::new(left, top, right - left, bottom - top))
    }

    /// Fraction of `self` inside `root`, in `0.0..=1.0`.
    ///
    /// A zero-area region counts as fully visible while it touches `root`.
    pub fn intersection_ratio(&self, root: &Self) -> f64 {
        let Some(overlap) = self.intersection(root) else {
            return 0.0;
        };
        let area = self.area();
        if area == 0.0 {
            return 1.0;
        }
        (overlap.area() / area).clamp(0.0, 1.0)
    }
}

/// Tuning for a single watch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchOptions {
    /// Skip observation entirely; the watch is resolved on creation.
    pub priority: bool,
    /// Minimum visible fraction, `0.0..=1.0`.
    pub threshold: f64,
    /// Pixels added around the viewport before intersecting.
    pub margin: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            priority: false,
            threshold: 0.1,
            margin: 50.0,
        }
    }
}

impl WatchOptions {
    /// Options used for priority content: resolved at once, threshold 0.
    pub fn priority() -> Self {
        Self {
            priority: true,
            threshold: 0.0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Whether `ratio` satisfies these options.
    pub fn is_satisfied_by(&self, ratio: f64) -> bool {
        ratio > 0.0 && ratio >= self.threshold
    }
}

type Detach = Box<dyn FnOnce() + Send>;

/// A one-shot visibility signal.
pub struct VisibilityWatch {
    rx: Option<oneshot::Receiver<()>>,
    detach: Option<Detach>,
}

impl VisibilityWatch {
    /// A watch that is already visible.
    pub fn resolved() -> Self {
        Self {
            rx: None,
            detach: None,
        }
    }

    /// A watch fired through `rx`; `detach` runs if the watch is dropped
    /// before it is consumed.
    pub fn pending(rx: oneshot::Receiver<()>, detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            rx: Some(rx),
            detach: Some(Box::new(detach)),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.is_none()
    }

    /// Wait for the region to become visible.
    ///
    /// `Err(Unavailable)` means the monitor went away before firing. Cancel
    /// safe: dropping this future leaves the watch pending.
    pub async fn visible(&mut self) -> Result<(), VisibilityError> {
        let Some(rx) = self.rx.as_mut() else {
            return Ok(());
        };
        let res = rx.await.map_err(|_| VisibilityError::Unavailable);
        self.rx = None;
        self.detach = None;
        res
    }
}

impl Drop for VisibilityWatch {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for VisibilityWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityWatch")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Source of one-shot visibility signals.
pub trait VisibilityMonitor: Send + Sync {
    /// Start watching `region`. Priority options must yield a resolved watch.
    fn watch(&self, region: RegionId, options: WatchOptions) -> Result<VisibilityWatch, VisibilityError>;
}

/// Every region is visible immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysVisible;

impl VisibilityMonitor for AlwaysVisible {
    fn watch(&self, _region: RegionId, _options: WatchOptions) -> Result<VisibilityWatch, VisibilityError> {
        Ok(VisibilityWatch::resolved())
    }
}

/// A runtime with no visibility detection at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl VisibilityMonitor for Unsupported {
    fn watch(&self, _region: RegionId, options: WatchOptions) -> Result<VisibilityWatch, VisibilityError> {
        if options.priority {
            return Ok(VisibilityWatch::resolved());
        }
        Err(VisibilityError::Unavailable)
    }
}

struct PendingWatch {
    region: RegionId,
    options: WatchOptions,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct ObserverState {
    viewport: Option<Rect>,
    regions: HashMap<RegionId, Rect>,
    pending: HashMap<u64, PendingWatch>,
    disconnected: bool,
}

impl ObserverState {
    fn is_visible(&self, region: RegionId, options: &WatchOptions) -> bool {
        let (Some(viewport), Some(rect)) = (self.viewport, self.regions.get(&region)) else {
            return false;
        };
        options.is_satisfied_by(rect.intersection_ratio(&viewport.expand(options.margin)))
    }

    /// Fire every pending watch whose region now satisfies its options.
    fn evaluate(&mut self) {
        let ready: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| self.is_visible(p.region, &p.options))
            .map(|(token, _)| *token)
            .collect();
        for token in ready {
            if let Some(p) = self.pending.remove(&token) {
                trace!(region = p.region.0, token, "region became visible");
                let _ = p.tx.send(());
            }
        }
    }
}

/// Intersection observer driven by the embedding host.
///
/// The host reports the viewport and region rectangles as layout changes;
/// each report re-evaluates the pending watches.
#[derive(Clone, Default)]
pub struct ViewportObserver {
    state: Arc<Mutex<ObserverState>>,
    next_token: Arc<AtomicU64>,
}

impl ViewportObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport(&self, viewport: Rect) {
        let mut state = self.state.lock();
        state.viewport = Some(viewport);
        state.evaluate();
    }

    pub fn update_region(&self, region: RegionId, rect: Rect) {
        let mut state = self.state.lock();
        state.regions.insert(region, rect);
        state.evaluate();
    }

    pub fn remove_region(&self, region: RegionId) {
        self.state.lock().regions.remove(&region);
    }

    /// Tear the observer down. Pending watches resolve as unavailable.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.disconnected = true;
        state.pending.clear();
    }

    /// Watches registered and not yet fired or detached.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl VisibilityMonitor for ViewportObserver {
    fn watch(&self, region: RegionId, options: WatchOptions) -> Result<VisibilityWatch, VisibilityError> {
        if options.priority {
            return Ok(VisibilityWatch::resolved());
        }

        let mut state = self.state.lock();
        if state.disconnected {
            return Err(VisibilityError::Unavailable);
        }
        if state.is_visible(region, &options) {
            return Ok(VisibilityWatch::resolved());
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        state.pending.insert(token, PendingWatch { region, options, tx });
        drop(state);

        let weak: Weak<Mutex<ObserverState>> = Arc::downgrade(&self.state);
        Ok(VisibilityWatch::pending(rx, move || {
            if let Some(state) = weak.upgrade()
                && state.lock().pending.remove(&token).is_some()
            {
                trace!(region = region.0, token, "watch detached before firing");
            }
        }))
    }
}

impl fmt::Debug for ViewportObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportObserver")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}
