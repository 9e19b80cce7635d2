use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::{Error, MARKER_RECORD, MAX_MARKER_LEN, Marker, Result};

/// Largest buffer reserved up front for a payload; record headers are not
/// trusted for sizing allocations.
const PAYLOAD_PREALLOC_LIMIT: u64 = 1 << 20;

/// State of the on-disk envelope relative to a freshly observed marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Stored marker equals the observed one.
    Hit,
    /// No envelope at the path.
    Miss,
    /// Stored marker differs from the observed one.
    Stale,
    /// Something other than an envelope occupies the path.
    Corrupt { reason: String },
}

impl Classification {
    /// Whether a new envelope should be written without further confirmation.
    pub fn needs_write(&self) -> bool { matches!(self, Self::Miss | Self::Stale) }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
            Self::Stale => write!(f, "stale"),
            Self::Corrupt { reason } => write!(f, "corrupt ({reason})"),
        }
    }
}

/// Header information of a well-formed envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeSummary {
    pub marker: Marker,
    pub payload_name: String,
    pub payload_size: u64,
}

/// A fully loaded envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub marker: Marker,
    pub payload_name: String,
    pub payload: Vec<u8>,
}

/// Compares the envelope at `path` against `marker`.
///
/// Only the first record is read. A missing file is [`Classification::Miss`];
/// a file whose first record is not [`MARKER_RECORD`] is
/// [`Classification::Corrupt`]. Other I/O failures are returned as errors.
pub fn classify(path: &Path, marker: &Marker) -> Result<Classification> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Classification::Miss),
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut archive = tar::Archive::new(file);
    let stored = match archive
        .entries()
        .map_err(|e| format!("unreadable archive: {e}"))
        .and_then(|mut entries| read_marker(&mut entries))
    {
        Ok(stored) => stored,
        Err(reason) => return Ok(Classification::Corrupt { reason }),
    };

    if stored == *marker {
        Ok(Classification::Hit)
    } else {
        Ok(Classification::Stale)
    }
}

/// Reads the marker and payload header of the envelope at `path` without
/// loading the payload.
pub fn open_envelope(path: &Path) -> Result<EnvelopeSummary> {
    let (summary, _) = walk(path, false)?;
    Ok(summary)
}

/// Loads both records of the envelope at `path`.
pub fn read_envelope(path: &Path) -> Result<Envelope> {
    let (summary, payload) = walk(path, true)?;
    Ok(Envelope {
        marker: summary.marker,
        payload_name: summary.payload_name,
        payload: payload.unwrap_or_default(),
    })
}

fn walk(path: &Path, load_payload: bool) -> Result<(EnvelopeSummary, Option<Vec<u8>>)> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let corrupt = |reason: String| Error::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let mut archive = tar::Archive::new(file);
    let mut entries = archive
        .entries()
        .map_err(|e| corrupt(format!("unreadable archive: {e}")))?;

    let marker = read_marker(&mut entries).map_err(corrupt)?;

    let (payload_name, payload_size, payload) = {
        let mut entry = next_record(&mut entries, "payload").map_err(corrupt)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let size = entry
            .header()
            .size()
            .map_err(|e| corrupt(format!("bad payload size: {e}")))?;

        let payload = if load_payload {
            let mut buf = Vec::with_capacity(size.min(PAYLOAD_PREALLOC_LIMIT) as usize);
            entry
                .read_to_end(&mut buf)
                .map_err(|e| corrupt(format!("truncated payload record: {e}")))?;
            if buf.len() as u64 != size {
                return Err(corrupt(format!(
                    "payload record holds {} of {size} bytes",
                    buf.len()
                )));
            }
            Some(buf)
        } else {
            None
        };
        (name, size, payload)
    };

    match entries.next() {
        None => {}
        Some(Ok(_)) => return Err(corrupt("more than two records".to_string())),
        Some(Err(e)) => return Err(corrupt(format!("unreadable data after payload: {e}"))),
    }

    Ok((
        EnvelopeSummary {
            marker,
            payload_name,
            payload_size,
        },
        payload,
    ))
}

fn next_record<'a, R: Read>(
    entries: &mut tar::Entries<'a, R>,
    what: &str,
) -> std::result::Result<tar::Entry<'a, R>, String> {
    match entries.next() {
        Some(Ok(entry)) => Ok(entry),
        Some(Err(e)) => Err(format!("unreadable {what} record: {e}")),
        None => Err(format!("missing {what} record")),
    }
}

fn read_marker<R: Read>(entries: &mut tar::Entries<'_, R>) -> std::result::Result<Marker, String> {
    let mut entry = next_record(entries, "marker")?;

    {
        let name = entry.path_bytes();
        if name.as_ref() != MARKER_RECORD.as_bytes() {
            return Err(format!(
                "first record is '{}', expected '{MARKER_RECORD}'",
                String::from_utf8_lossy(&name)
            ));
        }
    }

    let size = entry
        .header()
        .size()
        .map_err(|e| format!("bad marker size: {e}"))?;
    if size > MAX_MARKER_LEN {
        return Err(format!("marker record is {size} bytes"));
    }

    let mut stored = Vec::with_capacity(size as usize);
    entry
        .read_to_end(&mut stored)
        .map_err(|e| format!("truncated marker record: {e}"))?;
    Ok(Marker::new(stored))
}
