use std::time::Duration;

/// Events emitted by a single load session.
///
/// `session` is the process-unique id of the mount that produced the event.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    /// Session entered `Loading`.
    Started { session: u64, attempt: u32 },
    /// A request went out. `uri` is the absolute URL actually fetched.
    Requested {
        session: u64,
        attempt: u32,
        uri: String,
        preview: bool,
    },
    /// The low-quality preview arrived; the full source is still loading.
    PreviewLoaded { session: u64, uri: String },
    /// Fetch succeeded.
    Loaded {
        session: u64,
        uri: String,
        elapsed: Duration,
    },
    /// Fetch failed.
    Errored {
        session: u64,
        attempt: u32,
        attempts_remaining: u32,
        error: String,
    },
    /// `retry()` was called with no attempts left, or outside `Errored`.
    RetryIgnored { session: u64 },
    /// Visibility detection was unavailable; the region was treated as visible.
    VisibilityFailOpen { session: u64 },
    /// Session was unmounted or replaced.
    Cancelled { session: u64 },
}

impl LoadEvent {
    pub fn session(&self) -> u64 {
        match self {
            Self::Started { session, .. }
            | Self::Requested { session, .. }
            | Self::PreviewLoaded { session, .. }
            | Self::Loaded { session, .. }
            | Self::Errored { session, .. }
            | Self::RetryIgnored { session }
            | Self::VisibilityFailOpen { session }
            | Self::Cancelled { session } => *session,
        }
    }
}
