use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("URL path segment '{segment}' cannot be mapped to a local path")]
    UnsafePath { segment: String },

    #[error("URL '{0}' does not name a file")]
    NoFileName(String),

    #[error("'{path}' is not an envelope: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("marker is {len} bytes, more than the {max} an envelope can hold")]
    MarkerTooLong { len: u64, max: u64 },

    #[error("payload length mismatch: declared {declared} bytes, wrote {actual}")]
    ContentLengthMismatch { declared: u64, actual: u64 },

    #[error("failed to read '{path}'")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write envelope '{path}'")]
    Write { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Fs(#[from] govbulk_fs::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
