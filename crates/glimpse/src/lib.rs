#![forbid(unsafe_code)]

//! # Glimpse
//!
//! Progressive image loading: each mounted image runs a small state machine
//! (`Idle -> Loading -> Loaded | Errored`) that waits for visibility, picks
//! the best encoding the runtime can decode, fetches once per attempt and
//! retries only when the caller asks. A descriptor may carry a low-quality
//! preview that is shown while the full source loads; [`LoadBatch`] tracks a
//! group of images together and [`LoadMetrics`] aggregates outcomes.
//!
//! ```ignore
//! use glimpse::prelude::*;
//!
//! let loader = Loader::new(HttpClient::new(NetOptions::default())?);
//! let session = loader.mount(
//!     ResourceDescriptor::new("https://cdn.example.com/photo.jpg"),
//!     LoadConfig::new().with_priority(true),
//! )?;
//! let snapshot = session.settled().await;
//! ```

mod batch;
mod config;
mod controller;
mod epoch;
mod error;
mod metrics;
mod probe;
mod progress;
mod resolve;
mod session;
mod state;
mod visibility;

pub use crate::{
    batch::{BatchProgress, LoadBatch},
    config::{LoadCallback, LoadConfig, LoadingHint, Placeholder, RenderHints, VisibilityOptions},
    error::{LoadError, LoadResult},
    metrics::{LoadMetrics, MetricsSnapshot},
    probe::{CapabilityProber, DecodeAttempt, ImageDecodeAttempt, ProbeOptions},
    progress::{PROGRESS_CAP, PROGRESS_TICK, ProgressEstimator},
    resolve::{ALTERNATE_EXTENSION, ALTERNATE_MIME, ResolvedSources, SrcSet, SrcSetEntry, resolve},
    session::{LoadSession, Loader},
    state::{LoadSnapshot, LoadState, SessionId},
    visibility::{
        AlwaysVisible, Rect, RegionId, Unsupported, ViewportObserver, VisibilityError,
        VisibilityMonitor, VisibilityWatch, WatchOptions,
    },
};

pub mod descriptor {
    pub use glimpse_core::*;
}

pub mod events {
    pub use glimpse_events::*;
}

pub mod net {
    pub use glimpse_net::*;
}

pub mod prelude {
    pub use glimpse_core::{DensityTiers, ResourceDescriptor, RetryPolicy};
    pub use glimpse_events::{Event, EventBus, LoadEvent, ProbeEvent};
    pub use glimpse_net::{Headers, HttpClient, Net, NetExt, NetOptions};

    pub use crate::{
        BatchProgress, CapabilityProber, LoadBatch, LoadConfig, LoadError, LoadMetrics, LoadSession,
        LoadSnapshot, LoadState, Loader, Placeholder, RegionId, ViewportObserver, VisibilityMonitor,
    };
}
