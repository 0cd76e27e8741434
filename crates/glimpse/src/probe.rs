//! One-time capability negotiation for the alternate (WebP) encoding.
//!
//! The first [`CapabilityProber::probe`] decodes a tiny reference image; every
//! later call, concurrent ones included, shares that outcome. Nothing here can
//! fail: errors, panics and timeouts all resolve to `false`.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use glimpse_events::{EventBus, ProbeEvent};
use parking_lot::Mutex;
use image::ImageFormat;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::LoadError;

/// 2x2 lossy WebP used as the reference asset.
const REFERENCE_WEBP_B64: &str =
    "UklGRjoAAABXRUJQVlA4IC4AAACyAgCdASoCAAIALmk0mk0iIiIiIgBoSygABc6WWgAA/veff/0PP8bA//LwYAAA";
const REFERENCE_DIMENSIONS: (u32, u32) = (2, 2);

/// A decoder the prober can try the reference asset against.
///
/// Runs on a blocking thread.
#[cfg_attr(test, unimock::unimock(api = DecodeAttemptMock))]
pub trait DecodeAttempt: Send + Sync + 'static {
    /// Decoded `(width, height)`, or `None` if the asset cannot be decoded.
    fn dimensions(&self, asset: &[u8]) -> Option<(u32, u32)>;
}

/// Decodes with the `image` crate's WebP support.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecodeAttempt;

impl DecodeAttempt for ImageDecodeAttempt {
    fn dimensions(&self, asset: &[u8]) -> Option<(u32, u32)> {
        match image::load_from_memory_with_format(asset, ImageFormat::WebP) {
            Ok(img) => Some((img.width(), img.height())),
            Err(e) => {
                debug!(error = %e, "reference WebP did not decode");
                None
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProbeOptions {
    /// Upper bound on the decode attempt.
    pub timeout: Duration,
    pub bus: Option<EventBus>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            bus: None,
        }
    }
}

impl ProbeOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }
}

type ProbeTask = Shared<BoxFuture<'static, bool>>;

/// Memoized capability probe.
///
/// Production code shares [`CapabilityProber::global`]; tests build private
/// instances so outcomes never leak between them.
pub struct CapabilityProber {
    outcome: OnceCell<bool>,
    // Outlives any single caller, so a probe abandoned mid-flight is resumed
    // rather than restarted.
    task: Mutex<Option<ProbeTask>>,
    attempt: Arc<dyn DecodeAttempt>,
    options: ProbeOptions,
}

static GLOBAL_PROBER: OnceLock<Arc<CapabilityProber>> = OnceLock::new();

impl CapabilityProber {
    pub fn new(attempt: Arc<dyn DecodeAttempt>, options: ProbeOptions) -> Self {
        Self {
            outcome: OnceCell::new(),
            task: Mutex::new(None),
            attempt,
            options,
        }
    }

    /// Process-wide prober backed by [`ImageDecodeAttempt`].
    ///
    /// Lazily created on first call.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_PROBER.get_or_init(|| {
            Arc::new(Self::new(Arc::new(ImageDecodeAttempt), ProbeOptions::default()))
        }))
    }

    /// Whether the alternate encoding decodes. Runs the decode at most once.
    pub async fn probe(&self) -> bool {
        *self.outcome.get_or_init(|| self.task()).await
    }

    /// Outcome of a finished probe, without starting one.
    pub fn cached(&self) -> Option<bool> {
        self.outcome.get().copied()
    }

    fn task(&self) -> ProbeTask {
        let mut slot = self.task.lock();
        slot.get_or_insert_with(|| {
            run_probe(
                Arc::clone(&self.attempt),
                self.options.timeout,
                self.options.bus.clone(),
            )
            .boxed()
            .shared()
        })
        .clone()
    }
}

impl std::fmt::Debug for CapabilityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProber")
            .field("outcome", &self.cached())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

async fn run_probe(attempt: Arc<dyn DecodeAttempt>, timeout: Duration, bus: Option<EventBus>) -> bool {
    let supported = match decode_reference(attempt, timeout).await {
        Ok(supported) => supported,
        Err(e) => {
            warn!(error = %e, "capability probe failed, assuming unsupported");
            false
        }
    };
    debug!(supported, "capability probe resolved");
    if let Some(bus) = bus {
        bus.publish(ProbeEvent::Resolved { supported });
    }
    supported
}

async fn decode_reference(attempt: Arc<dyn DecodeAttempt>, timeout: Duration) -> Result<bool, LoadError> {
    let asset = STANDARD
        .decode(REFERENCE_WEBP_B64)
        .map_err(|e| LoadError::CapabilityProbeFailed(e.to_string()))?;

    let decode = tokio::task::spawn_blocking(move || attempt.dimensions(&asset));
    let dims = tokio::time::timeout(timeout, decode)
        .await
        .map_err(|_| LoadError::CapabilityProbeFailed("timed out".into()))?
        .map_err(|e| LoadError::CapabilityProbeFailed(e.to_string()))?;

    Ok(dims == Some(REFERENCE_DIMENSIONS))
}
