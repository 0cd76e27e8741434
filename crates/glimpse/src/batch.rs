//! Several images mounted and tracked as one unit.

use glimpse_core::ResourceDescriptor;
use tracing::debug;

use crate::{
    config::LoadConfig,
    error::LoadResult,
    session::{LoadSession, Loader, validate},
    state::LoadState,
};

/// Settled counts across a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    pub loaded: usize,
    /// Members currently `Errored`, whether or not they can still retry.
    pub failed: usize,
}

impl BatchProgress {
    /// Members still `Idle` or `Loading`.
    pub fn pending(&self) -> usize {
        self.total - self.loaded - self.failed
    }

    /// Every member loaded. An empty batch never is.
    pub fn is_all_loaded(&self) -> bool {
        self.total > 0 && self.loaded == self.total
    }

    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }
}

/// Sessions mounted together under one visibility region.
///
/// Members share the config, callbacks and bus. Dropping the batch unmounts
/// every member.
#[derive(Debug)]
pub struct LoadBatch {
    sessions: Vec<LoadSession>,
}

impl Loader {
    /// Mount every descriptor with a copy of `config`.
    ///
    /// All descriptors are validated before anything is mounted, so an invalid
    /// one mounts nothing. Without an explicit region the whole batch is
    /// observed as the region of its first member.
    pub fn mount_batch<I>(&self, descriptors: I, config: LoadConfig) -> LoadResult<LoadBatch>
    where
        I: IntoIterator<Item = ResourceDescriptor>,
    {
        let descriptors: Vec<_> = descriptors.into_iter().collect();
        for descriptor in &descriptors {
            validate(descriptor, &config)?;
        }

        let mut config = config;
        let mut sessions = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let session = self.mount(descriptor, config.clone())?;
            if config.region.is_none() {
                config.region = Some(session.region());
            }
            sessions.push(session);
        }
        debug!(members = sessions.len(), region = ?config.region, "batch mounted");
        Ok(LoadBatch { sessions })
    }
}

impl LoadBatch {
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[LoadSession] {
        &self.sessions
    }

    pub fn get(&self, index: usize) -> Option<&LoadSession> {
        self.sessions.get(index)
    }

    pub fn progress(&self) -> BatchProgress {
        let mut progress = BatchProgress {
            total: self.sessions.len(),
            ..BatchProgress::default()
        };
        for session in &self.sessions {
            match session.snapshot().state {
                LoadState::Loaded => progress.loaded += 1,
                LoadState::Errored => progress.failed += 1,
                LoadState::Idle | LoadState::Loading => {}
            }
        }
        progress
    }

    /// Indices of members in `state`, in mount order.
    pub fn indices_in(&self, state: LoadState) -> Vec<usize> {
        self.sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.snapshot().state == state)
            .map(|(i, _)| i)
            .collect()
    }

    /// Wait until every member is `Loaded` or `Errored`.
    pub async fn settled(&self) -> BatchProgress {
        for session in &self.sessions {
            session.settled().await;
        }
        self.progress()
    }

    /// Retry every failed member with attempts left. Returns how many were
    /// accepted.
    pub fn retry_failed(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.snapshot().can_retry() && s.retry())
            .count()
    }

    pub fn unmount(&self) {
        for session in &self.sessions {
            session.unmount();
        }
    }
}
