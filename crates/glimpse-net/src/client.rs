use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::trace;
use url::Url;

use crate::{
    error::{NetError, NetResult},
    traits::Net,
    types::{Headers, NetOptions},
};

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
    options: NetOptions,
}

impl HttpClient {
    pub fn new(options: NetOptions) -> NetResult<Self> {
        let mut builder = Client::builder().pool_max_idle_per_host(options.pool_max_idle_per_host);
        if let Some(ua) = &options.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let inner = builder.build().map_err(NetError::from)?;
        Ok(Self { inner, options })
    }

    /// Wrap an existing reqwest client, sharing its connection pool.
    pub fn from_client(inner: Client, options: NetOptions) -> Self {
        Self { inner, options }
    }

    pub fn options(&self) -> &NetOptions {
        &self.options
    }

    fn apply_headers(
        mut req: reqwest::RequestBuilder,
        headers: Option<Headers>,
    ) -> reqwest::RequestBuilder {
        if let Some(headers) = headers {
            for (k, v) in headers.iter() {
                req = req.header(k, v);
            }
        }
        req
    }
}

#[async_trait]
impl Net for HttpClient {
    async fn get_bytes(&self, url: Url, headers: Option<Headers>) -> NetResult<Bytes> {
        trace!(%url, "GET");
        let mut req = Self::apply_headers(self.inner.get(url.clone()), headers);
        if let Some(timeout) = self.options.request_timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(NetError::from)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::http_status(status.as_u16(), url.to_string()));
        }

        resp.bytes().await.map_err(NetError::from)
    }
}
