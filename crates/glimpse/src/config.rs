use std::{fmt, sync::Arc};

use glimpse_core::RetryPolicy;
use glimpse_events::EventBus;
use glimpse_net::Headers;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    state::LoadSnapshot,
    visibility::{RegionId, WatchOptions},
};

/// Notification invoked with the snapshot that triggered it.
///
/// Runs on the session task; an unmount from another thread waits for it to
/// return. It may call back into its own session, including `retry` and
/// `unmount`.
pub type LoadCallback = Arc<dyn Fn(&LoadSnapshot) + Send + Sync>;

/// What to draw before the image arrives. A rendering hint only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Placeholder {
    #[default]
    Skeleton,
    Icon,
    SolidColor(String),
    /// Blurred preview; without a data URI it renders as a skeleton.
    Blur { data_uri: Option<String> },
}

impl Placeholder {
    /// The placeholder that will actually be drawn.
    #[must_use]
    pub fn effective(&self) -> Self {
        match self {
            Self::Blur { data_uri: None } => Self::Skeleton,
            other => other.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadingHint {
    Eager,
    #[default]
    Lazy,
}

/// Pass-through rendering hints for the projector.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderHints {
    pub placeholder: Placeholder,
    /// HTML `sizes` attribute.
    pub sizes: String,
    pub loading: LoadingHint,
    /// Declared width / height, for reserving layout space.
    pub aspect_ratio: Option<f64>,
}

/// Intersection tuning for non-priority mounts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityOptions {
    pub threshold: f64,
    pub margin: f64,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        let w = WatchOptions::default();
        Self {
            threshold: w.threshold,
            margin: w.margin,
        }
    }
}

/// Per-mount configuration.
#[derive(Clone)]
pub struct LoadConfig {
    /// Bypass visibility gating and start loading inside `mount`.
    pub priority: bool,
    pub retry: RetryPolicy,
    pub visibility: VisibilityOptions,
    pub placeholder: Placeholder,
    pub sizes: String,
    /// Run the cosmetic progress estimate while loading.
    pub show_progress: bool,
    /// Negotiate the alternate encoding. When off, the prober is never consulted.
    pub alternate_encoding: bool,
    /// Base for relative descriptor URIs.
    pub origin: Option<Url>,
    /// Additional HTTP headers for the fetch.
    pub headers: Option<Headers>,
    /// Region to observe. Defaults to one derived from the session id.
    pub region: Option<RegionId>,
    pub bus: Option<EventBus>,
    /// Parent token; cancelling it unmounts the session.
    pub cancel: Option<CancellationToken>,
    pub on_load: Option<LoadCallback>,
    pub on_error: Option<LoadCallback>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            priority: false,
            retry: RetryPolicy::default(),
            visibility: VisibilityOptions::default(),
            placeholder: Placeholder::default(),
            sizes: "100vw".to_string(),
            show_progress: false,
            alternate_encoding: true,
            origin: None,
            headers: None,
            region: None,
            bus: None,
            cancel: None,
            on_load: None,
            on_error: None,
        }
    }
}

impl LoadConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: VisibilityOptions) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    #[must_use]
    pub fn with_sizes<S: Into<String>>(mut self, sizes: S) -> Self {
        self.sizes = sizes.into();
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[must_use]
    pub fn with_alternate_encoding(mut self, enabled: bool) -> Self {
        self.alternate_encoding = enabled;
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: RegionId) -> Self {
        self.region = Some(region);
        self
    }

    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn on_load<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoadSnapshot) + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoadSnapshot) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn watch_options(&self) -> WatchOptions {
        if self.priority {
            return WatchOptions::priority();
        }
        WatchOptions::default()
            .with_threshold(self.visibility.threshold)
            .with_margin(self.visibility.margin)
    }

    pub(crate) fn render_hints(&self, aspect_ratio: Option<f64>) -> RenderHints {
        RenderHints {
            placeholder: self.placeholder.effective(),
            sizes: self.sizes.clone(),
            loading: if self.priority {
                LoadingHint::Eager
            } else {
                LoadingHint::Lazy
            },
            aspect_ratio,
        }
    }
}

impl fmt::Debug for LoadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadConfig")
            .field("priority", &self.priority)
            .field("retry", &self.retry)
            .field("visibility", &self.visibility)
            .field("placeholder", &self.placeholder)
            .field("show_progress", &self.show_progress)
            .field("alternate_encoding", &self.alternate_encoding)
            .field("origin", &self.origin)
            .field("region", &self.region)
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
