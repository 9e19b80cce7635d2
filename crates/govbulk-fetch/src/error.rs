//! Error types for govbulk-fetch.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Network {
        url: Url,
        #[source]
        source: BoxError,
    },

    #[error("{url} answered with HTTP {status}")]
    HttpStatus { url: Url, status: u16 },

    #[error("'{path}' is occupied by something other than an envelope: {reason}")]
    EnvelopeCorrupt { path: PathBuf, reason: String },

    #[error("{url} declared {declared} bytes but sent {actual}")]
    ContentLengthMismatch { url: Url, declared: u64, actual: u64 },

    #[error("{url} sent a {len}-byte Last-Modified value, more than an envelope can hold")]
    MarkerTooLong { url: Url, len: u64 },

    #[error("{url} maps to envelope '{path}', already taken by {other}")]
    EnvelopeCollision { url: Url, path: PathBuf, other: Url },

    #[error("envelope I/O failed")]
    Envelope(#[source] govbulk_envelope::Error),

    #[error("failed to spool response body")]
    Spool(#[source] io::Error),

    #[error("concurrency gate closed")]
    GateClosed,

    #[error("task did not complete")]
    Join(#[from] tokio::task::JoinError),
}

impl FetchError {
    pub fn network<E>(url: &Url, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            url: url.clone(),
            source: Box::new(source),
        }
    }

    pub(crate) fn envelope(url: &Url, err: govbulk_envelope::Error) -> Self {
        match err {
            govbulk_envelope::Error::Corrupt { path, reason } => Self::EnvelopeCorrupt { path, reason },
            govbulk_envelope::Error::ContentLengthMismatch { declared, actual } => {
                Self::ContentLengthMismatch {
                    url: url.clone(),
                    declared,
                    actual,
                }
            }
            govbulk_envelope::Error::MarkerTooLong { len, .. } => Self::MarkerTooLong {
                url: url.clone(),
                len,
            },
            other => Self::Envelope(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
