use std::io::{self, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use govbulk_fs::StagedFile;

use crate::{Error, MARKER_RECORD, MAX_MARKER_LEN, Marker, Result};

/// Replaces the envelope at `path` with `marker` followed by `payload`.
///
/// `payload_len` is written into the payload record's header and must match
/// the number of bytes `payload` yields; on a mismatch nothing is written and
/// [`Error::ContentLengthMismatch`] is returned. The envelope is assembled in
/// a staging file beside `path` and renamed into place, creating parent
/// directories as needed.
///
/// A marker longer than [`MAX_MARKER_LEN`] is refused with
/// [`Error::MarkerTooLong`] before anything touches disk, since such an
/// envelope could never classify as a hit.
pub fn write_envelope<R: Read>(
    path: &Path,
    marker: &Marker,
    payload_name: &str,
    payload: R,
    payload_len: u64,
) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let marker_len = marker.len() as u64;
    if marker_len > MAX_MARKER_LEN {
        return Err(Error::MarkerTooLong {
            len: marker_len,
            max: MAX_MARKER_LEN,
        });
    }

    let mut staged = StagedFile::new(path)?;

    let mut limited = payload.take(payload_len);
    let written = {
        let mut builder = tar::Builder::new(staged.file_mut());

        let mut header = record_header(marker_len);
        builder
            .append_data(&mut header, MARKER_RECORD, marker.as_bytes())
            .map_err(write_err)?;

        let mut counted = Counting::new(&mut limited);
        let mut header = record_header(payload_len);
        builder
            .append_data(&mut header, payload_name, &mut counted)
            .map_err(write_err)?;
        let written = counted.count;

        builder.finish().map_err(write_err)?;
        written
    };

    let overflow = io::copy(&mut limited.into_inner(), &mut io::sink()).map_err(write_err)?;
    let actual = written + overflow;
    if actual != payload_len {
        return Err(Error::ContentLengthMismatch {
            declared: payload_len,
            actual,
        });
    }

    staged.commit()?;
    tracing::debug!(path = %path.display(), payload = payload_name, bytes = actual, "envelope written");
    Ok(())
}

fn record_header(size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(size);
    header.set_mtime(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    );
    header
}

struct Counting<R> {
    inner: R,
    count: u64,
}

impl<R> Counting<R> {
    fn new(inner: R) -> Self { Self { inner, count: 0 } }
}

impl<R: Read> Read for Counting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
