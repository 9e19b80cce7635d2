//! In-memory [`HttpClient`] for tests.
//!
//! [`StaticClient`] serves canned responses by URL and records how many
//! requests were in flight at once, so tests can check the concurrency
//! ceiling without a network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use url::Url;

use crate::http::{HttpClient, HttpResponse};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StaticClientError(String);

#[derive(Clone, Debug)]
enum Resource {
    Page {
        status:         u16,
        last_modified:  Option<Vec<u8>>,
        content_length: Option<u64>,
        body:           Bytes,
    },
    Unreachable,
}

/// Serves registered URLs; anything else answers 404.
#[derive(Debug, Default)]
pub struct StaticClient {
    resources:     Mutex<HashMap<String, Resource>>,
    requests:      Mutex<HashMap<String, usize>>,
    delay:         Duration,
    in_flight:     Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
}

/// Counts one request as in flight until its body is dropped.
#[derive(Debug)]
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

fn key(url: &str) -> String {
    Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string())
}

impl StaticClient {
    pub fn new() -> Self { Self::default() }

    /// Holds every request for `delay` before answering, and again before
    /// each body chunk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn insert(&self, url: &str, resource: Resource) {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(url), resource);
    }

    /// An HTML listing page.
    pub fn listing(&self, url: &str, html: impl Into<String>) {
        self.raw(url, Bytes::from(html.into()));
    }

    /// A 200 response without `Last-Modified`.
    pub fn raw(&self, url: &str, body: impl Into<Bytes>) {
        let body = body.into();
        self.insert(url, Resource::Page {
            status:         200,
            last_modified:  None,
            content_length: Some(body.len() as u64),
            body,
        });
    }

    /// A file with the given `Last-Modified` value.
    pub fn file(&self, url: &str, last_modified: &str, body: impl Into<Bytes>) {
        let body = body.into();
        let len = body.len() as u64;
        self.file_with_length(url, last_modified, body, len);
    }

    /// A file whose advertised `Content-Length` is `declared`, whatever the body.
    pub fn file_with_length(
        &self,
        url: &str,
        last_modified: &str,
        body: impl Into<Bytes>,
        declared: u64,
    ) {
        self.insert(url, Resource::Page {
            status:         200,
            last_modified:  Some(last_modified.as_bytes().to_vec()),
            content_length: Some(declared),
            body:           body.into(),
        });
    }

    /// A file sent without `Content-Length`.
    pub fn file_unsized(&self, url: &str, last_modified: &str, body: impl Into<Bytes>) {
        self.insert(url, Resource::Page {
            status:         200,
            last_modified:  Some(last_modified.as_bytes().to_vec()),
            content_length: None,
            body:           body.into(),
        });
    }

    /// An empty response with `status`.
    pub fn status(&self, url: &str, status: u16) {
        self.insert(url, Resource::Page {
            status,
            last_modified: None,
            content_length: Some(0),
            body: Bytes::new(),
        });
    }

    /// Requests for `url` fail before any response.
    pub fn unreachable(&self, url: &str) { self.insert(url, Resource::Unreachable); }

    /// Number of GETs issued for `url`.
    pub fn requests(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(url))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Highest number of GETs observed in flight at the same time. A GET
    /// stays in flight until its response body is dropped.
    pub fn max_in_flight(&self) -> usize { self.max_in_flight.load(Ordering::SeqCst) }
}

impl HttpClient for StaticClient {
    type Error = StaticClientError;

    async fn get(&self, url: &Url) -> Result<HttpResponse<Self::Error>, Self::Error> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = InFlight(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_default() += 1;

        let delay = self.delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let resource = self
            .resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url.as_str())
            .cloned();

        let (status, last_modified, content_length, body) = match resource {
            Some(Resource::Unreachable) => {
                return Err(StaticClientError(format!("connection refused: {url}")));
            }
            Some(Resource::Page {
                status,
                last_modified,
                content_length,
                body,
            }) => (status, last_modified, content_length, body),
            None => (404, None, Some(0), Bytes::new()),
        };

        // split so consumers see a multi-chunk stream
        let mid = body.len() / 2;
        let chunks: Vec<Result<Bytes, StaticClientError>> =
            vec![Ok(body.slice(..mid)), Ok(body.slice(mid..))];
        let body = futures_util::stream::iter(chunks).then(move |chunk| {
            let _held = &guard;
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                chunk
            }
        });

        Ok(HttpResponse {
            status,
            last_modified,
            content_length,
            body: Box::pin(body),
        })
    }
}
