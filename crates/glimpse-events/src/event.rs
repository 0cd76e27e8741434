use crate::{LoadEvent, ProbeEvent};

/// Unified glimpse event.
///
/// Hierarchical: each subsystem has its own variant with a sub-enum.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Load(LoadEvent),
    Probe(ProbeEvent),
}

impl From<LoadEvent> for Event {
    fn from(e: LoadEvent) -> Self {
        Self::Load(e)
    }
}

impl From<ProbeEvent> for Event {
    fn from(e: ProbeEvent) -> Self {
        Self::Probe(e)
    }
}
