use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::TryStreamExt;
use govbulk_envelope::{
    Classification, EnvelopeLocation, MAX_MARKER_LEN, Marker, classify, envelope_location,
    write_envelope,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::http::{BoxStream, HttpClient};
use crate::{FetchError, FileDescriptor, Gate, ProgressCounter, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveOptions {
    /// Replace files at envelope paths that are not envelopes. Without this,
    /// such files are reported as [`FetchError::EnvelopeCorrupt`] and left
    /// untouched.
    pub overwrite_corrupt: bool,
}

/// What happened to one file's envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveOutcome {
    /// Marker unchanged; the body was drained and discarded.
    Hit,
    /// No envelope existed; one was created.
    Miss,
    /// Marker changed; the envelope was replaced.
    Stale,
    /// A non-envelope file was replaced on request.
    CorruptReplaced,
}

/// Fetches files and keeps their envelopes current.
///
/// Every call to [`Archiver::archive`] holds one [`Gate`] slot from before the
/// request until the body has been drained or archived, and advances the
/// shared [`ProgressCounter`] however it ends.
pub struct Archiver<C> {
    client:     Arc<C>,
    gate:       Gate,
    output_dir: PathBuf,
    options:    ArchiveOptions,
    progress:   ProgressCounter,
}

impl<C: HttpClient> Archiver<C> {
    pub fn new(client: Arc<C>, gate: Gate, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            gate,
            output_dir: output_dir.into(),
            options: ArchiveOptions::default(),
            progress: ProgressCounter::hidden(0),
        }
    }

    pub fn with_options(mut self, options: ArchiveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCounter) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> &ProgressCounter { &self.progress }

    #[tracing::instrument(skip_all, fields(url = %descriptor.url))]
    pub async fn archive(&self, descriptor: &FileDescriptor) -> Result<ArchiveOutcome> {
        let result = self.fetch_and_store(descriptor).await;
        let completed = self.progress.complete_one();
        debug!(completed, total = self.progress.total(), "file finished");
        result
    }

    /// Where the envelope for `descriptor` lives under the output directory.
    pub(crate) fn location(&self, descriptor: &FileDescriptor) -> Result<EnvelopeLocation> {
        envelope_location(&self.output_dir, &descriptor.url, &descriptor.extension)
            .map_err(|e| FetchError::envelope(&descriptor.url, e))
    }

    async fn fetch_and_store(&self, descriptor: &FileDescriptor) -> Result<ArchiveOutcome> {
        let url = &descriptor.url;
        let _permit = self.gate.acquire().await?;

        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| FetchError::network(url, e))?;
        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.clone(),
                status: response.status,
            });
        }

        let location = self.location(descriptor)?;
        let marker = Marker::new(response.last_modified.unwrap_or_default());
        let marker_len = marker.len() as u64;
        if marker_len > MAX_MARKER_LEN {
            return Err(FetchError::MarkerTooLong {
                url: url.clone(),
                len: marker_len,
            });
        }
        let declared = response.content_length;
        let body = response.body;

        let classification = {
            let path = location.path.clone();
            let marker = marker.clone();
            tokio::task::spawn_blocking(move || classify(&path, &marker))
                .await?
                .map_err(|e| FetchError::envelope(url, e))?
        };

        let outcome = match classification {
            Classification::Hit => {
                let drained = drain(body, url).await?;
                debug!(bytes = drained, "hit, body discarded");
                return Ok(ArchiveOutcome::Hit);
            }
            Classification::Miss => ArchiveOutcome::Miss,
            Classification::Stale => ArchiveOutcome::Stale,
            Classification::Corrupt { reason } if self.options.overwrite_corrupt => {
                warn!(path = %location.path.display(), %reason, "replacing corrupt envelope");
                ArchiveOutcome::CorruptReplaced
            }
            Classification::Corrupt { reason } => {
                return Err(FetchError::EnvelopeCorrupt {
                    path: location.path,
                    reason,
                });
            }
        };

        let (spool, actual) = spool(body, url).await?;
        if let Some(declared) = declared.filter(|d| *d != actual) {
            return Err(FetchError::ContentLengthMismatch {
                url: url.clone(),
                declared,
                actual,
            });
        }

        tokio::task::spawn_blocking(move || {
            write_envelope(&location.path, &marker, &location.payload_name, spool, actual)
        })
        .await?
        .map_err(|e| FetchError::envelope(url, e))?;

        debug!(?outcome, bytes = actual, "envelope updated");
        Ok(outcome)
    }
}

/// Streams `body` into an anonymous temporary file and rewinds it.
async fn spool<E>(
    mut body: BoxStream<'static, std::result::Result<Bytes, E>>,
    url: &Url,
) -> Result<(std::fs::File, u64)>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let file = tempfile::tempfile().map_err(FetchError::Spool)?;
    let mut file = tokio::fs::File::from_std(file);

    let mut len = 0u64;
    while let Some(chunk) = body.try_next().await.map_err(|e| FetchError::network(url, e))? {
        file.write_all(&chunk).await.map_err(FetchError::Spool)?;
        len += chunk.len() as u64;
    }
    file.flush().await.map_err(FetchError::Spool)?;

    let mut file = file.into_std().await;
    file.seek(SeekFrom::Start(0)).map_err(FetchError::Spool)?;
    Ok((file, len))
}

async fn drain<E>(
    mut body: BoxStream<'static, std::result::Result<Bytes, E>>,
    url: &Url,
) -> Result<u64>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let mut len = 0u64;
    while let Some(chunk) = body.try_next().await.map_err(|e| FetchError::network(url, e))? {
        len += chunk.len() as u64;
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticClient;
    use govbulk_envelope::read_envelope;
    use tempfile::tempdir;

    fn descriptor(url: &str) -> FileDescriptor {
        FileDescriptor::new(Url::parse(url).unwrap(), ".txt")
    }

    #[tokio::test]
    async fn miss_creates_envelope() {
        let dir = tempdir().unwrap();
        let client = Arc::new(StaticClient::new());
        client.file("https://h/a/doc.txt", "M1", "hello");

        let archiver = Archiver::new(client, Gate::new(1), dir.path());
        let outcome = archiver.archive(&descriptor("https://h/a/doc.txt")).await.unwrap();

        assert_eq!(outcome, ArchiveOutcome::Miss);
        let envelope = read_envelope(&dir.path().join("a/doc.tar")).unwrap();
        assert_eq!(envelope.marker, Marker::from("M1"));
        assert_eq!(envelope.payload, b"hello");
        assert_eq!(archiver.progress().completed(), 1);
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let dir = tempdir().unwrap();
        let client = Arc::new(StaticClient::new());

        let archiver = Archiver::new(client, Gate::new(1), dir.path());
        let err = archiver.archive(&descriptor("https://h/missing.txt")).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
        assert!(!dir.path().join("missing.tar").exists());
        assert_eq!(archiver.progress().completed(), 1);
        assert_eq!(archiver.gate.available(), 1);
    }

    #[tokio::test]
    async fn declared_length_mismatch_writes_nothing() {
        let dir = tempdir().unwrap();
        let client = Arc::new(StaticClient::new());
        client.file_with_length("https://h/doc.txt", "M1", "hello", 9);

        let archiver = Archiver::new(client, Gate::new(1), dir.path());
        let err = archiver.archive(&descriptor("https://h/doc.txt")).await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::ContentLengthMismatch {
                declared: 9,
                actual: 5,
                ..
            }
        ));
        assert!(!dir.path().join("doc.tar").exists());
    }

    #[tokio::test]
    async fn missing_marker_is_stored_empty() {
        let dir = tempdir().unwrap();
        let client = Arc::new(StaticClient::new());
        client.raw("https://h/raw.txt", "no last-modified here");

        let archiver = Archiver::new(client, Gate::new(1), dir.path());
        archiver.archive(&descriptor("https://h/raw.txt")).await.unwrap();
        let again = archiver.archive(&descriptor("https://h/raw.txt")).await.unwrap();

        assert_eq!(again, ArchiveOutcome::Hit);
        assert!(read_envelope(&dir.path().join("raw.tar")).unwrap().marker.is_empty());
    }

    #[tokio::test]
    async fn unadvertised_length_uses_spooled_size() {
        let dir = tempdir().unwrap();
        let client = Arc::new(StaticClient::new());
        client.file_unsized("https://h/a/doc.txt", "M1", "streamed without a length");

        let archiver = Archiver::new(client, Gate::new(1), dir.path());
        let outcome = archiver.archive(&descriptor("https://h/a/doc.txt")).await.unwrap();

        assert_eq!(outcome, ArchiveOutcome::Miss);
        let path = dir.path().join("a/doc.tar");
        let located = govbulk_envelope::open_envelope(&path).unwrap();
        assert_eq!(located.payload_size, "streamed without a length".len() as u64);
        let envelope = read_envelope(&path).unwrap();
        assert_eq!(envelope.marker, Marker::from("M1"));
        assert_eq!(envelope.payload, b"streamed without a length");
    }

    #[tokio::test]
    async fn oversized_marker_never_leaves_an_unreadable_envelope() {
        let dir = tempdir().unwrap();
        let client = Arc::new(StaticClient::new());
        let archiver = Archiver::new(Arc::clone(&client), Gate::new(1), dir.path());
        let file = descriptor("https://h/a/doc.txt");

        client.file("https://h/a/doc.txt", &"x".repeat(5000), "hello");
        for _ in 0..2 {
            let err = archiver.archive(&file).await.unwrap_err();
            assert!(matches!(err, FetchError::MarkerTooLong { len: 5000, .. }));
        }
        assert!(!dir.path().join("a/doc.tar").exists());
        assert_eq!(archiver.gate.available(), 1);

        let at_limit = "x".repeat(MAX_MARKER_LEN as usize);
        client.file("https://h/a/doc.txt", &at_limit, "hello");
        assert_eq!(archiver.archive(&file).await.unwrap(), ArchiveOutcome::Miss);
        assert_eq!(archiver.archive(&file).await.unwrap(), ArchiveOutcome::Hit);
    }
}
