use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use url::Url;

use crate::{error::LoadError, resolve::ResolvedSources};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one load session.
///
/// A replaced descriptor gets a fresh id, so anything tagged with the old id
/// is recognisably stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

impl LoadState {
    /// `Loaded` or `Errored`: nothing is in flight.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Loaded | Self::Errored)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Errored => "errored",
        })
    }
}

/// Everything a renderer needs to draw one mounted image.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadSnapshot {
    pub session: SessionId,
    pub state: LoadState,
    pub attempt_count: u32,
    pub attempts_remaining: u32,
    /// Cosmetic 0..=100 estimate. Never derived from transfer progress.
    pub progress_estimate: u8,
    /// What is on screen: the preview while the full source loads, then the
    /// resolved source once it has loaded.
    pub active_uri: Option<Url>,
    /// `active_uri` is the full-quality source rather than a preview.
    pub high_quality: bool,
    pub sources: Option<ResolvedSources>,
    /// Time from entering `Loading` to `Loaded` for the successful attempt.
    pub load_duration: Option<Duration>,
    pub last_error: Option<LoadError>,
}

impl LoadSnapshot {
    pub(crate) fn idle(session: SessionId, max_attempts: u32) -> Self {
        Self {
            session,
            state: LoadState::Idle,
            attempt_count: 0,
            attempts_remaining: max_attempts,
            progress_estimate: 0,
            active_uri: None,
            high_quality: false,
            sources: None,
            load_duration: None,
            last_error: None,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.state == LoadState::Errored && self.attempts_remaining > 0
    }
}
