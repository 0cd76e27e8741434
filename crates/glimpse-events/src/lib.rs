#![forbid(unsafe_code)]

//! Event bus shared by glimpse load sessions and the capability prober.

mod bus;
mod event;
mod load;
mod probe;

pub use bus::EventBus;
pub use event::Event;
pub use load::LoadEvent;
pub use probe::ProbeEvent;
