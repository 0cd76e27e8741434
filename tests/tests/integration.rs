//! All integration tests for glimpse
#![allow(
    clippy::unwrap_used,
    reason = "integration test crate, unwraps are acceptable in test code"
)]

mod batch;
mod events;
mod glimpse_net;
mod probe;
mod resolve;
mod session;
