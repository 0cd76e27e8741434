//! Scripted per-path replies shared by [`ScriptedNet`](crate::ScriptedNet)
//! and [`TestHttpServer::scripted`](crate::TestHttpServer::scripted).

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use parking_lot::Mutex;

/// A canned response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Bytes,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Bytes::from_static(b"error"),
            delay: None,
        }
    }

    /// 200 with no body.
    pub fn empty() -> Self {
        Self::ok(Bytes::new())
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Default)]
struct ScriptState {
    replies: HashMap<String, VecDeque<Reply>>,
    hits: HashMap<String, usize>,
}

/// Replies keyed by URL path. Each path's queue is consumed in order; the
/// last reply repeats. Unknown paths get a 404.
#[derive(Clone, Default)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `replies` for `path`.
    #[must_use]
    pub fn route<I>(self, path: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        self.state
            .lock()
            .replies
            .entry(path.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Record a hit on `path` and return its next reply.
    pub fn next_reply(&self, path: &str) -> Reply {
        let mut state = self.state.lock();
        *state.hits.entry(path.to_string()).or_default() += 1;
        match state.replies.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Reply::status(404)),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Reply::status(404)),
            None => Reply::status(404),
        }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.lock().hits.values().sum()
    }

    /// Paths requested at least once, sorted.
    pub fn requested_paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.state.lock().hits.keys().cloned().collect();
        paths.sort();
        paths
    }
}
