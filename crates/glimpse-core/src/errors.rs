use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("base URI is empty")]
    EmptyBaseUri,
    #[error("preview URI is empty")]
    EmptyPreviewUri,
    #[error("density tier must be positive, got {0}")]
    InvalidDensityTier(u32),
    #[error("cannot resolve URI {uri:?}: {reason}")]
    UnresolvableUri { uri: String, reason: String },
    #[error("retry policy must allow at least one attempt")]
    ZeroMaxAttempts,
}

pub type CoreResult<T> = Result<T, CoreError>;
