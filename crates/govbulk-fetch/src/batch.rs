//! Download phase: one archiver task per file, joined before returning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{StreamExt, stream::FuturesUnordered};
use tracing::warn;
use url::Url;

use crate::{ArchiveOutcome, Archiver, FetchError, FileDescriptor, HttpClient, TaskFailure};

/// Tally of a finished download phase.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub total:            usize,
    pub hits:             usize,
    pub misses:           usize,
    pub stale:            usize,
    pub corrupt_replaced: usize,
    pub failures:         Vec<TaskFailure>,
}

impl DownloadReport {
    fn record(&mut self, url: Url, result: Result<ArchiveOutcome, FetchError>) {
        match result {
            Ok(ArchiveOutcome::Hit) => self.hits += 1,
            Ok(ArchiveOutcome::Miss) => self.misses += 1,
            Ok(ArchiveOutcome::Stale) => self.stale += 1,
            Ok(ArchiveOutcome::CorruptReplaced) => self.corrupt_replaced += 1,
            Err(error) => {
                warn!(%url, %error, "download failed");
                self.failures.push(TaskFailure { url, error });
            }
        }
    }

    pub fn succeeded(&self) -> usize { self.hits + self.misses + self.stale + self.corrupt_replaced }

    /// Envelopes created or replaced.
    pub fn written(&self) -> usize { self.misses + self.stale + self.corrupt_replaced }

    pub fn is_success(&self) -> bool { self.failures.is_empty() }
}

/// Archives every descriptor concurrently and waits for all of them.
///
/// Concurrency is bounded by the archiver's gate, not by the number of
/// spawned tasks. A failing file never stops its siblings; failures are
/// collected in the report.
///
/// Files whose URLs differ only in extension share an envelope path. The
/// first one listed is archived and the rest fail with
/// [`FetchError::EnvelopeCollision`] without being requested.
pub async fn archive_all<C>(
    archiver: Arc<Archiver<C>>,
    descriptors: &[FileDescriptor],
) -> DownloadReport
where
    C: HttpClient + 'static,
{
    let mut claimed: HashMap<PathBuf, Url> = HashMap::new();
    let mut collisions = Vec::new();
    let mut unique = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        // a location error is left for the task to report
        if let Ok(location) = archiver.location(descriptor) {
            if let Some(other) = claimed.get(&location.path) {
                collisions.push((descriptor.url.clone(), FetchError::EnvelopeCollision {
                    url: descriptor.url.clone(),
                    path: location.path,
                    other: other.clone(),
                }));
                continue;
            }
            claimed.insert(location.path, descriptor.url.clone());
        }
        unique.push(descriptor.clone());
    }

    let mut tasks: FuturesUnordered<_> = unique
        .into_iter()
        .map(|descriptor| {
            let archiver = Arc::clone(&archiver);
            let url = descriptor.url.clone();
            let handle = tokio::spawn(async move { archiver.archive(&descriptor).await });
            async move { (url, handle.await) }
        })
        .collect();

    let mut report = DownloadReport {
        total: descriptors.len(),
        ..DownloadReport::default()
    };

    for (url, error) in collisions {
        archiver.progress().complete_one();
        report.record(url, Err(error));
    }

    while let Some((url, joined)) = tasks.next().await {
        report.record(url, joined.map_err(FetchError::from).and_then(|r| r));
    }

    archiver.progress().finish();
    report
}
