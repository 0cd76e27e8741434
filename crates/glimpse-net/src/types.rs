use std::{collections::HashMap, time::Duration};

/// Extra request headers, e.g. an auth token for a private CDN.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        Self { inner: map }
    }
}

#[derive(Clone, Debug)]
pub struct NetOptions {
    /// Per-request deadline applied by reqwest. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// Max idle connections per host.
    pub pool_max_idle_per_host: usize,
    pub user_agent: Option<String>,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            pool_max_idle_per_host: 8,
            user_agent: None,
        }
    }
}

impl NetOptions {
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    #[must_use]
    pub fn with_user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.user_agent = Some(ua.into());
        self
    }
}
