use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Timeout")]
    Timeout,
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },
    #[error("empty response body for URL: {url}")]
    EmptyBody { url: String },
}

impl NetError {
    pub fn http_status(status: u16, url: String) -> Self {
        Self::HttpStatus { status, url }
    }

    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Informational only: the load controller never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::EmptyBody { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429 || *status == 408,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = error.status() {
            let url = error.url().map(ToString::to_string).unwrap_or_default();
            return Self::HttpStatus {
                status: status.as_u16(),
                url,
            };
        }
        Self::Http(error.to_string())
    }
}

pub type NetResult<T> = Result<T, NetError>;
