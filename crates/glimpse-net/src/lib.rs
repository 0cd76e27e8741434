#![forbid(unsafe_code)]

//! Transport layer for glimpse.
//!
//! [`Net`] is the seam the load controller fetches through. [`HttpClient`]
//! is the reqwest-backed implementation; [`TimeoutNet`] bounds any `Net`
//! with a deadline via [`NetExt::with_timeout`].

mod client;
mod error;
mod timeout;
mod traits;
mod types;

pub use crate::{
    client::HttpClient,
    error::{NetError, NetResult},
    timeout::TimeoutNet,
    traits::{Net, NetExt},
    types::{Headers, NetOptions},
};
