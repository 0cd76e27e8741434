#![forbid(unsafe_code)]

//! Core types shared across the glimpse crates: the caller-supplied
//! [`ResourceDescriptor`], the per-mount [`RetryPolicy`] and URI resolution
//! against an optional origin.

mod descriptor;
mod errors;
mod policy;
mod uri;

pub use descriptor::{DEFAULT_DENSITY_TIERS, DensityTiers, ResourceDescriptor};
pub use errors::{CoreError, CoreResult};
pub use policy::RetryPolicy;
pub use uri::resolve_uri;
