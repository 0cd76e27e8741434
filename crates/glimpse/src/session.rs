use std::{fmt, sync::Arc};

use glimpse_core::{ResourceDescriptor, resolve_uri};
use glimpse_events::LoadEvent;
use glimpse_net::Net;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::{LoadConfig, RenderHints},
    controller::{Command, Controller, ControllerParts, Liveness, SnapshotChannel},
    error::{LoadError, LoadResult},
    probe::CapabilityProber,
    state::{LoadSnapshot, SessionId},
    visibility::{AlwaysVisible, RegionId, VisibilityMonitor},
};

/// Shared dependencies for mounting images: transport, capability prober and
/// visibility monitor.
///
/// Cheap to clone. Defaults to the global prober and [`AlwaysVisible`].
#[derive(Clone)]
pub struct Loader {
    net: Arc<dyn Net>,
    prober: Arc<CapabilityProber>,
    monitor: Arc<dyn VisibilityMonitor>,
}

impl Loader {
    pub fn new<N: Net + 'static>(net: N) -> Self {
        Self {
            net: Arc::new(net),
            prober: CapabilityProber::global(),
            monitor: Arc::new(AlwaysVisible),
        }
    }

    #[must_use]
    pub fn with_prober(mut self, prober: Arc<CapabilityProber>) -> Self {
        self.prober = prober;
        self
    }

    #[must_use]
    pub fn with_monitor<M: VisibilityMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    pub fn prober(&self) -> &Arc<CapabilityProber> {
        &self.prober
    }

    /// Mount `descriptor` and start its load session.
    ///
    /// Priority mounts, and mounts on a runtime without visibility detection,
    /// are already `Loading` when this returns. Must be called within a Tokio
    /// runtime.
    pub fn mount(&self, descriptor: ResourceDescriptor, config: LoadConfig) -> LoadResult<LoadSession> {
        validate(&descriptor, &config)?;

        let id = SessionId::next();
        let region = config.region.unwrap_or(RegionId(id.get()));
        let channel = Arc::new(SnapshotChannel::new(LoadSnapshot::idle(
            id,
            config.retry.max_attempts,
        )));
        let rx = channel.subscribe();
        let active = self.start(id, &descriptor, &config, region, &channel);

        Ok(LoadSession {
            loader: self.clone(),
            config,
            descriptor,
            region,
            channel,
            rx,
            active,
        })
    }

    fn start(
        &self,
        id: SessionId,
        descriptor: &ResourceDescriptor,
        config: &LoadConfig,
        region: RegionId,
        channel: &Arc<SnapshotChannel>,
    ) -> ActiveSession {
        let cancel = config
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let liveness = Arc::new(Liveness::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let (watch, immediate) = if config.priority {
            (None, true)
        } else {
            match self.monitor.watch(region, config.watch_options()) {
                Ok(watch) if watch.is_resolved() => (None, true),
                Ok(watch) => (Some(watch), false),
                Err(e) => {
                    warn!(session = id.get(), error = %e, "visibility detection unavailable, treating region as visible");
                    if let Some(bus) = &config.bus {
                        bus.publish(LoadEvent::VisibilityFailOpen { session: id.get() });
                    }
                    (None, true)
                }
            }
        };

        let mut controller = Controller::new(ControllerParts {
            id,
            descriptor: descriptor.clone(),
            policy: config.retry,
            net: Arc::clone(&self.net),
            prober: Arc::clone(&self.prober),
            alternate_encoding: config.alternate_encoding,
            origin: config.origin.clone(),
            headers: config.headers.clone(),
            show_progress: config.show_progress,
            bus: config.bus.clone(),
            on_load: config.on_load.clone(),
            on_error: config.on_error.clone(),
            cancel: cancel.clone(),
            liveness: Arc::clone(&liveness),
            channel: Arc::clone(channel),
            cmd_rx,
            watch,
        });
        channel.switch_to(controller.initial_snapshot());
        if immediate {
            controller.enter_loading();
        }
        debug!(session = id.get(), region = region.0, priority = config.priority, "mounted");
        tokio::spawn(controller.run());

        ActiveSession {
            id,
            cmd_tx,
            cancel,
            liveness,
        }
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("prober", &self.prober)
            .finish_non_exhaustive()
    }
}

pub(crate) fn validate(descriptor: &ResourceDescriptor, config: &LoadConfig) -> LoadResult<()> {
    descriptor.validate()?;
    config.retry.validate()?;
    resolve_uri(descriptor.base_uri(), config.origin.as_ref())?;
    if let Some(preview) = descriptor.preview_uri() {
        resolve_uri(preview, config.origin.as_ref())?;
    }
    Ok(())
}

/// Handle to the session currently driving one descriptor.
struct ActiveSession {
    id: SessionId,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    liveness: Arc<Liveness>,
}

impl ActiveSession {
    /// Detach, abort and silence the session. Idempotent.
    ///
    /// Waits for a callback already running on another thread to return.
    fn shutdown(&self, config: &LoadConfig) {
        if !self.liveness.kill() {
            return;
        }
        self.cancel.cancel();
        debug!(session = self.id.get(), "session shut down");
        if let Some(bus) = &config.bus {
            bus.publish(LoadEvent::Cancelled {
                session: self.id.get(),
            });
        }
    }

    fn is_live(&self) -> bool {
        self.liveness.is_alive() && !self.cancel.is_cancelled()
    }
}

/// A mounted image.
///
/// Dropping the handle unmounts it.
pub struct LoadSession {
    loader: Loader,
    config: LoadConfig,
    descriptor: ResourceDescriptor,
    region: RegionId,
    channel: Arc<SnapshotChannel>,
    rx: watch::Receiver<LoadSnapshot>,
    active: ActiveSession,
}

impl LoadSession {
    pub fn id(&self) -> SessionId {
        self.active.id
    }

    /// Region the visibility monitor observes for this mount.
    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        self.rx.borrow().clone()
    }

    /// Receiver of every published snapshot. Stays valid across `replace`.
    pub fn subscribe(&self) -> watch::Receiver<LoadSnapshot> {
        self.channel.subscribe()
    }

    /// Wait until the current session publishes a snapshot matching `f`.
    pub async fn wait_for<F>(&self, mut f: F) -> LoadSnapshot
    where
        F: FnMut(&LoadSnapshot) -> bool,
    {
        let id = self.active.id;
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.session == id && f(s)).await {
            Ok(s) => s.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Wait for `Loaded` or `Errored`.
    pub async fn settled(&self) -> LoadSnapshot {
        self.wait_for(|s| s.state.is_settled()).await
    }

    /// Ask for another attempt after a failure.
    ///
    /// Returns `false`, and changes nothing, unless the session is `Errored`
    /// with attempts remaining.
    pub fn retry(&self) -> bool {
        let accepted = self.active.is_live() && self.rx.borrow().can_retry();
        // The session re-checks; a rejected request is still reported there.
        let _ = self.active.cmd_tx.send(Command::Retry);
        accepted
    }

    /// Stop the session: detach its visibility watch, abort any in-flight
    /// fetch and suppress all further callbacks. Idempotent.
    pub fn unmount(&self) {
        self.active.shutdown(&self.config);
    }

    pub fn is_mounted(&self) -> bool {
        self.active.is_live()
    }

    /// Swap in a new descriptor: the current session is torn down and a
    /// fresh one starts with a full retry budget.
    ///
    /// An invalid descriptor is rejected and the current session keeps
    /// running. Replacing with an equal descriptor does nothing. An unmounted
    /// handle stays unmounted.
    pub fn replace(&mut self, descriptor: ResourceDescriptor) -> LoadResult<()> {
        if !self.active.is_live() {
            return Err(LoadError::Unmounted);
        }
        if descriptor == self.descriptor {
            return Ok(());
        }
        validate(&descriptor, &self.config)?;

        self.active.shutdown(&self.config);
        let id = SessionId::next();
        self.active = self
            .loader
            .start(id, &descriptor, &self.config, self.region, &self.channel);
        self.descriptor = descriptor;
        Ok(())
    }

    pub fn render_hints(&self) -> RenderHints {
        self.config.render_hints(self.descriptor.aspect_ratio())
    }

    /// The last error, if the session is `Errored`.
    pub fn last_error(&self) -> Option<LoadError> {
        self.rx.borrow().last_error.clone()
    }
}

impl Drop for LoadSession {
    fn drop(&mut self) {
        self.active.shutdown(&self.config);
    }
}

impl fmt::Debug for LoadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSession")
            .field("id", &self.active.id)
            .field("region", &self.region)
            .field("descriptor", &self.descriptor)
            .field("state", &self.rx.borrow().state)
            .finish_non_exhaustive()
    }
}
