use glimpse_core::CoreError;
use glimpse_net::NetError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The runtime cannot observe visibility. Handled by failing open.
    #[error("visibility detection unavailable")]
    VisibilityDetectionUnavailable,

    /// The decode probe failed. Handled as "alternate encoding unsupported".
    #[error("capability probe failed: {0}")]
    CapabilityProbeFailed(String),

    #[error("fetch failed: {0}")]
    FetchFailed(#[from] NetError),

    #[error("invalid descriptor: {0}")]
    DescriptorInvalid(#[from] CoreError),

    /// The handle was unmounted; it cannot start another session.
    #[error("session is unmounted")]
    Unmounted,
}

impl LoadError {
    /// Whether a caller-driven retry makes sense for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
