//! In-process [`Net`] driven by a [`Script`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use glimpse_net::{Headers, Net, NetError, NetResult};
use tokio::sync::Semaphore;
use url::Url;

use crate::script::{Reply, Script};

/// Transport double that answers from a [`Script`] without any sockets.
///
/// A gated net holds every request until [`ScriptedNet::release`] is called,
/// which keeps a session in `Loading` for as long as a test needs.
#[derive(Clone)]
pub struct ScriptedNet {
    script: Script,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedNet {
    pub fn new(script: Script) -> Self {
        Self { script, gate: None }
    }

    /// `path` answers with `reply` on every request.
    pub fn always(path: &str, reply: Reply) -> Self {
        Self::new(Script::new().route(path, [reply]))
    }

    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held requests through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn hits(&self, path: &str) -> usize {
        self.script.hits(path)
    }

    pub fn total_hits(&self) -> usize {
        self.script.total_hits()
    }
}

#[async_trait]
impl Net for ScriptedNet {
    async fn get_bytes(&self, url: Url, _headers: Option<Headers>) -> NetResult<Bytes> {
        let reply = self.script.next_reply(url.path());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| NetError::http("gate closed"))?
                .forget();
        }
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if !reply.is_success() {
            return Err(NetError::http_status(reply.status, url.to_string()));
        }
        Ok(reply.body)
    }
}
