//! Cache envelopes: one tar archive per downloaded file.
//!
//! An envelope holds exactly two records, in order:
//!
//! 1. [`MARKER_RECORD`], whose content is the remote `Last-Modified` value
//!    observed when the payload was fetched.
//! 2. The payload itself, named after the remote file.
//!
//! [`classify`] compares the stored marker with a freshly observed one to
//! decide whether the payload must be fetched again, and [`write_envelope`]
//! replaces an envelope atomically.
//!
//! # Architecture
//!
//! - `path.rs` - URL to on-disk location mapping
//! - `codec.rs` - Classification and read-back
//! - `writer.rs` - Staged envelope creation

pub use codec::{Classification, Envelope, EnvelopeSummary, classify, open_envelope, read_envelope};
pub use error::{Error, Result};
pub use path::{EnvelopeLocation, envelope_location};
pub use writer::write_envelope;

mod codec;
mod error;
mod path;
mod writer;

/// Name of the first record in every envelope.
pub const MARKER_RECORD: &str = "Last-Modified.txt";

/// File extension of envelopes on disk.
pub const ENVELOPE_EXTENSION: &str = "tar";

/// Upper bound on a marker. [`write_envelope`] refuses longer ones and
/// [`classify`] treats a longer stored record as not an envelope.
pub const MAX_MARKER_LEN: u64 = 4096;

/// Opaque last-modification indicator. Only ever compared byte for byte.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Marker(Vec<u8>);

impl Marker {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self { Self(bytes.into()) }

    pub fn as_bytes(&self) -> &[u8] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<&[u8]> for Marker {
    fn from(bytes: &[u8]) -> Self { Self(bytes.to_vec()) }
}

impl From<&str> for Marker {
    fn from(s: &str) -> Self { Self(s.as_bytes().to_vec()) }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
