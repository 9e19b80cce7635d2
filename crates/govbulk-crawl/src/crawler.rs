//! Crawl coordinator.
//!
//! Each listing page is fetched and parsed by its own spawned task, which
//! only returns the raw row links. The coordinator owns all mutable state
//! (frontier and visited sets), resolves the links and spawns a task per
//! new sub-listing. The crawl ends when no task is outstanding.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures_util::{StreamExt, stream::FuturesUnordered};
use govbulk_fetch::{FetchError, Gate, HttpClient, TaskFailure};
use tracing::{debug, info, warn};
use url::Url;

use crate::{Frontier, Link, classify_link, parse_listing};

/// Result of a crawl phase.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub frontier:         Frontier,
    /// Listing pages fetched, including failed ones.
    pub listings_visited: usize,
    pub failures:         Vec<TaskFailure>,
}

impl CrawlReport {
    pub fn total(&self) -> usize { self.listings_visited }

    pub fn succeeded(&self) -> usize { self.listings_visited - self.failures.len() }

    pub fn is_success(&self) -> bool { self.failures.is_empty() }
}

/// Walks listing pages below a root, gated like every other request.
#[derive(Debug)]
pub struct Crawler<C> {
    client: Arc<C>,
    gate:   Gate,
    base:   Url,
}

impl<C: HttpClient + 'static> Crawler<C> {
    /// `base` is the URL row links are resolved against.
    pub fn new(client: Arc<C>, gate: Gate, base: Url) -> Self { Self { client, gate, base } }

    pub async fn crawl(&self, root: Url) -> CrawlReport {
        let mut report = CrawlReport::default();
        let mut visited = HashSet::new();
        let mut seen = HashSet::new();
        let mut pending = FuturesUnordered::new();

        visited.insert(root.clone());
        pending.push(self.spawn_visit(root));

        while let Some((listing, result)) = pending.next().await {
            report.listings_visited += 1;

            let hrefs = match result {
                Ok(hrefs) => hrefs,
                Err(error) => {
                    warn!(url = %listing, %error, "listing failed");
                    report.failures.push(TaskFailure {
                        url: listing,
                        error,
                    });
                    continue;
                }
            };

            for href in hrefs {
                match classify_link(&self.base, &href) {
                    Ok(Link::Listing(url)) => {
                        if visited.insert(url.clone()) {
                            pending.push(self.spawn_visit(url));
                        } else {
                            debug!(%url, "listing already visited");
                        }
                    }
                    Ok(Link::File(file)) => {
                        if seen.insert(file.url.clone()) {
                            report.frontier.push(file);
                        }
                    }
                    Err(error) => debug!(%listing, %href, %error, "skipping unresolvable link"),
                }
            }
        }

        info!(
            listings = report.listings_visited,
            files = report.frontier.len(),
            failures = report.failures.len(),
            "crawl finished"
        );
        report
    }

    fn spawn_visit(
        &self,
        url: Url,
    ) -> impl Future<Output = (Url, Result<Vec<String>, FetchError>)> + use<C> {
        let client = Arc::clone(&self.client);
        let gate = self.gate.clone();
        let target = url.clone();
        let handle = tokio::spawn(async move { visit(client.as_ref(), &gate, &target).await });
        async move {
            let result = handle.await.map_err(FetchError::from).and_then(|r| r);
            (url, result)
        }
    }
}

/// Fetches and parses one listing while holding a gate slot.
#[tracing::instrument(skip_all, fields(url = %url))]
async fn visit<C: HttpClient>(client: &C, gate: &Gate, url: &Url) -> Result<Vec<String>, FetchError> {
    let permit = gate.acquire().await?;

    let response = client.get(url).await.map_err(|e| FetchError::network(url, e))?;
    if !response.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.clone(),
            status: response.status,
        });
    }
    let body = response.bytes().await.map_err(|e| FetchError::network(url, e))?;
    let hrefs = parse_listing(&String::from_utf8_lossy(&body));

    permit.release();
    debug!(links = hrefs.len(), "listing parsed");
    Ok(hrefs)
}
