//! HTTP client abstraction.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Status line, caching headers and body of a GET response.
pub struct HttpResponse<E> {
    pub status: u16,
    /// Raw `Last-Modified` header value, if the server sent one.
    pub last_modified: Option<Vec<u8>>,
    /// Advertised `Content-Length`, if any.
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, E>>,
}

impl<E> HttpResponse<E> {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    /// Collects the whole body into memory.
    pub async fn bytes(self) -> Result<Vec<u8>, E> {
        let mut body = self.body;
        let mut buf = Vec::new();
        while let Some(chunk) = body.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }
}

impl<E> std::fmt::Debug for HttpResponse<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("last_modified", &self.last_modified.as_deref().map(String::from_utf8_lossy))
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations follow redirects and apply their own timeouts. A non-2xx
/// status is a successful call; callers inspect [`HttpResponse::status`].
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - [`crate::testing::StaticClient`]: In-memory implementation for tests
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issues a GET for `url` and returns once the response headers arrive.
    fn get(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<HttpResponse<Self::Error>, Self::Error>> + Send;
}

#[derive(Debug, Error)]
pub enum ClientSettingError {
    #[error("invalid proxy URL {url}")]
    Proxy {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to build client")]
    Build(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Transport tuning for the production client.
///
/// Response compression is never negotiated, so `Content-Length` describes
/// the bytes actually streamed.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientSetting {
    pub connect_timeout_secs:   u64,
    pub tcp_keepalive_secs:     u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    /// Whole-request timeout; unset means none.
    pub request_timeout_secs:   Option<u64>,
    pub user_agent:             String,
    pub proxies:                Vec<String>,
}

impl Default for ClientSetting {
    fn default() -> Self {
        Self {
            connect_timeout_secs:   30,
            tcp_keepalive_secs:     30,
            pool_max_idle_per_host: 100,
            pool_idle_timeout_secs: 90,
            request_timeout_secs:   None,
            user_agent:             concat!("govbulk/", env!("CARGO_PKG_VERSION")).to_string(),
            proxies:                Vec::new(),
        }
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use reqwest::header::LAST_MODIFIED;
    use reqwest::{Client, Proxy};

    use super::*;

    impl ClientSetting {
        pub fn build(&self) -> Result<Client, ClientSettingError> {
            let mut cb = Client::builder()
                .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
                .tcp_keepalive(Duration::from_secs(self.tcp_keepalive_secs))
                .pool_max_idle_per_host(self.pool_max_idle_per_host)
                .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
                .user_agent(self.user_agent.clone())
                .no_gzip()
                .no_brotli()
                .no_deflate();

            if let Some(secs) = self.request_timeout_secs {
                cb = cb.timeout(Duration::from_secs(secs));
            }

            let (secure, insecure): (Vec<&String>, Vec<&String>) =
                self.proxies.iter().partition(|u| u.starts_with("https://"));

            for u in secure {
                cb = cb.proxy(Proxy::https(u.as_str()).map_err(|source| {
                    ClientSettingError::Proxy {
                        url: u.clone(),
                        source: Box::new(source),
                    }
                })?);
            }

            for u in insecure {
                cb = cb.proxy(Proxy::http(u.as_str()).map_err(|source| {
                    ClientSettingError::Proxy {
                        url: u.clone(),
                        source: Box::new(source),
                    }
                })?);
            }

            cb.build().map_err(|e| ClientSettingError::Build(Box::new(e)))
        }
    }

    /// Production HTTP client implementation using reqwest.
    #[derive(Clone, Debug)]
    pub struct ReqwestClient {
        client: Client,
    }

    impl ReqwestClient {
        pub fn new(setting: &ClientSetting) -> Result<Self, ClientSettingError> {
            Ok(Self {
                client: setting.build()?,
            })
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(&self, url: &Url) -> Result<HttpResponse<Self::Error>, Self::Error> {
            let response = self.client.get(url.clone()).send().await?;

            let status = response.status().as_u16();
            let last_modified = response
                .headers()
                .get(LAST_MODIFIED)
                .map(|v| v.as_bytes().to_vec());
            let content_length = response.content_length();

            Ok(HttpResponse {
                status,
                last_modified,
                content_length,
                body: Box::pin(response.bytes_stream()),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
