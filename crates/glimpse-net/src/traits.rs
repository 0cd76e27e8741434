use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::{error::NetResult, timeout::TimeoutNet, types::Headers};

#[async_trait]
pub trait Net: Send + Sync {
    /// Fetch the full body of `url`. Non-2xx responses are errors.
    async fn get_bytes(&self, url: Url, headers: Option<Headers>) -> NetResult<Bytes>;
}

#[async_trait]
impl<N: Net + ?Sized> Net for Arc<N> {
    async fn get_bytes(&self, url: Url, headers: Option<Headers>) -> NetResult<Bytes> {
        (**self).get_bytes(url, headers).await
    }
}

pub trait NetExt: Net + Sized {
    /// Add timeout layer
    fn with_timeout(self, timeout: Duration) -> TimeoutNet<Self> {
        TimeoutNet::new(self, timeout)
    }
}

impl<T: Net> NetExt for T {}
