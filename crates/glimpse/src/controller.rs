//! The per-session actor.
//!
//! One task owns all mutable session state. Commands, the visibility signal,
//! fetch completion and progress ticks are handled one at a time by a biased
//! `select!`, so transitions never interleave and no lock guards the state.

use std::{
    future::pending,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use futures::{FutureExt, future::BoxFuture};
use glimpse_core::{ResourceDescriptor, RetryPolicy, resolve_uri};
use glimpse_events::{EventBus, LoadEvent};
use glimpse_net::{Headers, Net, NetError};
use parking_lot::ReentrantMutex;
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::{
    config::LoadCallback,
    epoch::EpochValidator,
    error::{LoadError, LoadResult},
    probe::CapabilityProber,
    progress::{PROGRESS_TICK, ProgressEstimator},
    resolve::{ResolvedSources, resolve},
    state::{LoadSnapshot, LoadState, SessionId},
    visibility::{VisibilityError, VisibilityWatch},
};

#[derive(Debug)]
pub(crate) enum Command {
    Retry,
}

/// Snapshot channel shared by every session a mount goes through.
///
/// Only the session named by `live` may publish, so a replaced session can
/// never overwrite its successor's state.
#[derive(Debug)]
pub(crate) struct SnapshotChannel {
    tx: watch::Sender<LoadSnapshot>,
    live: AtomicU64,
}

impl SnapshotChannel {
    pub(crate) fn new(initial: LoadSnapshot) -> Self {
        let live = AtomicU64::new(initial.session.get());
        let (tx, _) = watch::channel(initial);
        Self { tx, live }
    }

    /// Hand the channel to a new session and publish its first snapshot.
    pub(crate) fn switch_to(&self, initial: LoadSnapshot) {
        self.live.store(initial.session.get(), Ordering::SeqCst);
        self.tx.send_replace(initial);
    }

    fn publish(&self, snapshot: LoadSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if self.live.load(Ordering::SeqCst) != snapshot.session.get() {
                return false;
            }
            *current = snapshot;
            true
        })
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LoadSnapshot> {
        self.tx.subscribe()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// Low-quality source, fetched first when the descriptor has one.
    Preview,
    Full,
}

/// Result of one fetch, tagged with the epoch that issued it.
struct FetchOutcome {
    epoch: u64,
    stage: Stage,
    /// Set for [`Stage::Full`].
    sources: Option<ResolvedSources>,
    result: LoadResult<Url>,
}

/// Liveness shared between a session task and its handle.
///
/// `alive` is read lock-free by the handle. `running` is held while a
/// callback runs so that shutdown from another thread waits for it to return;
/// it is reentrant, so a callback may unmount its own session.
#[derive(Debug)]
pub(crate) struct Liveness {
    alive: AtomicBool,
    running: ReentrantMutex<()>,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            running: ReentrantMutex::new(()),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the session dead once no callback is running on another thread.
    /// Returns `false` if it was already dead.
    pub(crate) fn kill(&self) -> bool {
        let _running = self.running.lock();
        self.alive.swap(false, Ordering::AcqRel)
    }
}

/// Everything a session needs that is fixed for its lifetime.
pub(crate) struct ControllerParts {
    pub(crate) id: SessionId,
    pub(crate) descriptor: ResourceDescriptor,
    pub(crate) policy: RetryPolicy,
    pub(crate) net: Arc<dyn Net>,
    pub(crate) prober: Arc<CapabilityProber>,
    pub(crate) alternate_encoding: bool,
    pub(crate) origin: Option<Url>,
    pub(crate) headers: Option<Headers>,
    pub(crate) show_progress: bool,
    pub(crate) bus: Option<EventBus>,
    pub(crate) on_load: Option<LoadCallback>,
    pub(crate) on_error: Option<LoadCallback>,
    pub(crate) cancel: CancellationToken,
    pub(crate) liveness: Arc<Liveness>,
    pub(crate) channel: Arc<SnapshotChannel>,
    pub(crate) cmd_rx: mpsc::UnboundedReceiver<Command>,
    pub(crate) watch: Option<VisibilityWatch>,
}

pub(crate) struct Controller {
    parts: ControllerParts,
    snapshot: LoadSnapshot,
    epoch: EpochValidator,
    in_flight: Option<BoxFuture<'static, FetchOutcome>>,
    ticker: Option<Interval>,
    progress: ProgressEstimator,
    loading_since: Option<Instant>,
    preview_shown: bool,
}

impl Controller {
    pub(crate) fn new(parts: ControllerParts) -> Self {
        let snapshot = LoadSnapshot::idle(parts.id, parts.policy.max_attempts);
        let progress = ProgressEstimator::new(parts.id.get());
        Self {
            parts,
            snapshot,
            epoch: EpochValidator::default(),
            in_flight: None,
            ticker: None,
            progress,
            loading_since: None,
            preview_shown: false,
        }
    }

    pub(crate) fn initial_snapshot(&self) -> LoadSnapshot {
        self.snapshot.clone()
    }

    pub(crate) async fn run(mut self) {
        trace!(session = self.session(), "session task started");
        loop {
            tokio::select! {
                biased;

                () = self.parts.cancel.cancelled() => {
                    debug!(session = self.session(), state = %self.snapshot.state, "session cancelled");
                    break;
                }
                cmd = self.parts.cmd_rx.recv() => match cmd {
                    Some(Command::Retry) => self.on_retry(),
                    None => break,
                },
                res = wait_visible(&mut self.parts.watch) => self.on_visible(res),
                outcome = wait_fetch(&mut self.in_flight) => self.on_fetch(outcome),
                () = wait_tick(&mut self.ticker) => self.on_tick(),
            }
        }
        // Dropping `self` detaches the watch and aborts any in-flight fetch.
        trace!(session = self.session(), "session task stopped");
    }

    fn session(&self) -> u64 {
        self.parts.id.get()
    }

    /// `Idle | Errored -> Loading`. Issues exactly one fetch.
    pub(crate) fn enter_loading(&mut self) {
        if !self.parts.policy.can_attempt(self.snapshot.attempt_count) {
            return;
        }
        let attempt = self.snapshot.attempt_count + 1;
        let epoch = self.epoch.next_epoch();

        self.snapshot.state = LoadState::Loading;
        self.snapshot.attempt_count = attempt;
        self.snapshot.attempts_remaining = self.parts.policy.attempts_remaining(attempt);
        self.snapshot.last_error = None;
        self.progress.reset();
        self.snapshot.progress_estimate = self.progress.get();

        // Resolve up front when the capability is already known; otherwise
        // the fetch resolves once the probe finishes.
        let cached = if self.parts.alternate_encoding {
            self.parts.prober.cached()
        } else {
            Some(false)
        };
        self.snapshot.sources = cached.map(|alt| resolve(&self.parts.descriptor, alt));

        self.loading_since = Some(Instant::now());
        self.ticker = self.parts.show_progress.then(|| {
            let mut ticker = interval_at(Instant::now() + PROGRESS_TICK, PROGRESS_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        self.in_flight = Some(match self.parts.descriptor.preview_uri() {
            Some(preview) if !self.preview_shown => self.fetch_preview(epoch, preview.to_string()),
            _ => self.fetch_full(epoch),
        });

        debug!(
            session = self.session(),
            epoch,
            attempt,
            uri = self.parts.descriptor.base_uri(),
            "loading"
        );
        self.emit(LoadEvent::Started {
            session: self.session(),
            attempt,
        });
        self.publish();
    }

    fn request(&self) -> Request {
        Request {
            net: Arc::clone(&self.parts.net),
            origin: self.parts.origin.clone(),
            headers: self.parts.headers.clone(),
            bus: self.parts.bus.clone(),
            session: self.session(),
            attempt: self.snapshot.attempt_count,
        }
    }

    fn fetch_preview(&self, epoch: u64, preview: String) -> BoxFuture<'static, FetchOutcome> {
        let request = self.request();
        async move {
            let result = request.send(&preview, true).await;
            FetchOutcome {
                epoch,
                stage: Stage::Preview,
                sources: None,
                result,
            }
        }
        .boxed()
    }

    /// Fetch the full-quality source, resolving it first unless the sources
    /// were already resolved on entry.
    fn fetch_full(&self, epoch: u64) -> BoxFuture<'static, FetchOutcome> {
        let request = self.request();
        let resolved = self.snapshot.sources.clone();
        let prober = Arc::clone(&self.parts.prober);
        let descriptor = self.parts.descriptor.clone();
        let alternate = self.parts.alternate_encoding;

        async move {
            let sources = match resolved {
                Some(sources) => sources,
                None => resolve(&descriptor, alternate && prober.probe().await),
            };
            let result = request.send(&sources.primary_src, false).await;
            FetchOutcome {
                epoch,
                stage: Stage::Full,
                sources: Some(sources),
                result,
            }
        }
        .boxed()
    }

    fn on_visible(&mut self, res: Result<(), VisibilityError>) {
        self.parts.watch = None;
        if res.is_err() {
            warn!(
                session = self.session(),
                error = %LoadError::VisibilityDetectionUnavailable,
                "treating region as visible"
            );
            self.emit(LoadEvent::VisibilityFailOpen {
                session: self.session(),
            });
        }
        if self.snapshot.state == LoadState::Idle {
            self.enter_loading();
        }
    }

    fn on_fetch(&mut self, outcome: FetchOutcome) {
        self.in_flight = None;
        if !self.epoch.is_current(outcome.epoch) || self.snapshot.state != LoadState::Loading {
            trace!(
                session = self.session(),
                fetch_epoch = outcome.epoch,
                current_epoch = self.epoch.current(),
                "discarding stale fetch outcome"
            );
            return;
        }
        if outcome.stage == Stage::Preview {
            self.on_preview(outcome.epoch, outcome.result);
            return;
        }

        self.ticker = None;
        self.snapshot.sources = outcome.sources;
        match outcome.result {
            Ok(url) => {
                let elapsed = self.loading_since.take().map(|t| t.elapsed()).unwrap_or_default();
                self.progress.complete();
                self.snapshot.state = LoadState::Loaded;
                self.snapshot.progress_estimate = self.progress.get();
                self.snapshot.load_duration = Some(elapsed);
                self.snapshot.active_uri = Some(url.clone());
                self.snapshot.high_quality = true;

                debug!(session = self.session(), %url, ?elapsed, "loaded");
                self.emit(LoadEvent::Loaded {
                    session: self.session(),
                    uri: url.to_string(),
                    elapsed,
                });
                self.publish();
                self.notify(self.parts.on_load.as_ref());
            }
            Err(error) => {
                self.loading_since = None;
                self.progress.reset();
                self.snapshot.state = LoadState::Errored;
                self.snapshot.progress_estimate = self.progress.get();
                self.snapshot.last_error = Some(error.clone());

                warn!(
                    session = self.session(),
                    attempt = self.snapshot.attempt_count,
                    attempts_remaining = self.snapshot.attempts_remaining,
                    %error,
                    "load failed"
                );
                self.emit(LoadEvent::Errored {
                    session: self.session(),
                    attempt: self.snapshot.attempt_count,
                    attempts_remaining: self.snapshot.attempts_remaining,
                    error: error.to_string(),
                });
                self.publish();
                self.notify(self.parts.on_error.as_ref());
            }
        }
    }

    /// Show the preview if it arrived, then go on to the full source either way.
    fn on_preview(&mut self, epoch: u64, result: LoadResult<Url>) {
        self.preview_shown = true;
        match result {
            Ok(url) => {
                debug!(session = self.session(), %url, "preview loaded");
                self.emit(LoadEvent::PreviewLoaded {
                    session: self.session(),
                    uri: url.to_string(),
                });
                self.snapshot.active_uri = Some(url);
                self.snapshot.high_quality = false;
                self.publish();
            }
            Err(error) => {
                debug!(session = self.session(), %error, "preview failed, loading full source");
            }
        }
        self.in_flight = Some(self.fetch_full(epoch));
    }

    fn on_retry(&mut self) {
        if !self.snapshot.can_retry() {
            debug!(
                session = self.session(),
                state = %self.snapshot.state,
                attempts_remaining = self.snapshot.attempts_remaining,
                "retry ignored"
            );
            self.emit(LoadEvent::RetryIgnored {
                session: self.session(),
            });
            return;
        }
        self.enter_loading();
    }

    fn on_tick(&mut self) {
        if self.snapshot.state != LoadState::Loading {
            self.ticker = None;
            return;
        }
        let value = self.progress.tick();
        if value != self.snapshot.progress_estimate {
            self.snapshot.progress_estimate = value;
            self.publish();
        }
    }

    fn publish(&self) {
        if !self.parts.channel.publish(self.snapshot.clone()) {
            trace!(session = self.session(), "snapshot from superseded session dropped");
        }
    }

    fn emit(&self, event: LoadEvent) {
        if let Some(bus) = &self.parts.bus {
            bus.publish(event);
        }
    }

    fn notify(&self, callback: Option<&LoadCallback>) {
        let Some(callback) = callback else {
            return;
        };
        let _running = self.parts.liveness.running.lock();
        if !self.parts.liveness.is_alive() || self.parts.cancel.is_cancelled() {
            trace!(session = self.session(), "callback suppressed after unmount");
            return;
        }
        callback(&self.snapshot);
    }
}

/// Everything one request needs, detached from the actor.
struct Request {
    net: Arc<dyn Net>,
    origin: Option<Url>,
    headers: Option<Headers>,
    bus: Option<EventBus>,
    session: u64,
    attempt: u32,
}

impl Request {
    /// Fetch `src`. A 2xx with a non-empty body is a success.
    async fn send(&self, src: &str, preview: bool) -> LoadResult<Url> {
        let url = resolve_uri(src, self.origin.as_ref())?;
        if let Some(bus) = &self.bus {
            bus.publish(LoadEvent::Requested {
                session: self.session,
                attempt: self.attempt,
                uri: url.to_string(),
                preview,
            });
        }
        let body = self.net.get_bytes(url.clone(), self.headers.clone()).await?;
        if body.is_empty() {
            return Err(NetError::EmptyBody {
                url: url.to_string(),
            }
            .into());
        }
        Ok(url)
    }
}

async fn wait_visible(watch: &mut Option<VisibilityWatch>) -> Result<(), VisibilityError> {
    match watch {
        Some(watch) => watch.visible().await,
        None => pending().await,
    }
}

async fn wait_fetch(in_flight: &mut Option<BoxFuture<'static, FetchOutcome>>) -> FetchOutcome {
    match in_flight {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn wait_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}
