//! Two-phase run: crawl to completion, then download to completion.

use std::sync::Arc;

use govbulk_crawl::{CrawlReport, Crawler};
use govbulk_fetch::{
    ArchiveOptions, Archiver, DownloadReport, Gate, HttpClient, ProgressCounter, TaskFailure,
    archive_all,
};
use tracing::info;
use url::Url;

use crate::{Config, ConfigError};

/// Outcome of a full run.
#[derive(Debug)]
pub struct RunReport {
    pub crawl:    CrawlReport,
    pub download: DownloadReport,
}

impl RunReport {
    pub fn is_success(&self) -> bool { self.crawl.is_success() && self.download.is_success() }

    /// Every failed listing and file, crawl failures first.
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailure> {
        self.crawl.failures.iter().chain(&self.download.failures)
    }
}

/// Whether the download phase draws the `Progress: n/m` line on stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgressMode {
    #[default]
    Hidden,
    Stdout,
}

pub struct Driver<C> {
    client:   Arc<C>,
    gate:     Gate,
    root:     Url,
    base:     Url,
    config:   Config,
    progress: ProgressMode,
}

impl<C: HttpClient + 'static> Driver<C> {
    /// Both phases share one gate of `config.concurrency` slots; they never
    /// overlap, so each phase is bounded on its own.
    pub fn new(client: Arc<C>, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client,
            gate: Gate::new(config.concurrency),
            root: config.root_url()?,
            base: config.base_url()?,
            config,
            progress: ProgressMode::Hidden,
        })
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    /// Phase 1 only.
    pub async fn crawl(&self) -> CrawlReport {
        info!(root = %self.root, concurrency = self.gate.capacity(), "crawl started");
        Crawler::new(Arc::clone(&self.client), self.gate.clone(), self.base.clone())
            .crawl(self.root.clone())
            .await
    }

    /// Crawls, then archives every discovered file.
    pub async fn run(&self) -> RunReport {
        let crawl = self.crawl().await;
        let download = self.download(&crawl).await;
        RunReport { crawl, download }
    }

    async fn download(&self, crawl: &CrawlReport) -> DownloadReport {
        let files = crawl.frontier.as_slice();
        info!(
            files = files.len(),
            output_dir = %self.config.output_dir.display(),
            "download started"
        );

        let total = files.len() as u64;
        let progress = match self.progress {
            ProgressMode::Hidden => ProgressCounter::hidden(total),
            ProgressMode::Stdout => ProgressCounter::stdout(total),
        };
        let archiver = Archiver::new(
            Arc::clone(&self.client),
            self.gate.clone(),
            self.config.output_dir.clone(),
        )
        .with_options(ArchiveOptions {
            overwrite_corrupt: self.config.overwrite_corrupt,
        })
        .with_progress(progress);

        let report = archive_all(Arc::new(archiver), files).await;
        info!(
            total = report.total,
            hits = report.hits,
            misses = report.misses,
            stale = report.stale,
            corrupt_replaced = report.corrupt_replaced,
            failures = report.failures.len(),
            "download finished"
        );
        report
    }
}
