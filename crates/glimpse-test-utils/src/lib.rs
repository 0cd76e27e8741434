#![forbid(unsafe_code)]

//! Shared test utilities for the glimpse workspace.

pub mod http_server;
pub mod net;
pub mod script;

pub use http_server::TestHttpServer;
pub use net::ScriptedNet;
pub use script::{Reply, Script};
