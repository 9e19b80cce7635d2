use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::{ENVELOPE_EXTENSION, Error, Result};

/// Where a remote file is cached and what its payload record is called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeLocation {
    pub path: PathBuf,
    pub payload_name: String,
}

/// Maps a file URL to its envelope under `root`.
///
/// The directory mirrors the URL path; the file name is the URL basename
/// with `extension` (including its leading dot, e.g. `.xml`) replaced by
/// `.tar`. Percent-encoded segments are decoded and rejected if they could
/// escape `root`.
pub fn envelope_location(root: &Path, url: &Url, extension: &str) -> Result<EnvelopeLocation> {
    let mut segments = url
        .path_segments()
        .ok_or_else(|| Error::NoFileName(url.to_string()))?
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect::<Result<Vec<_>>>()?;

    let payload_name = segments
        .pop()
        .ok_or_else(|| Error::NoFileName(url.to_string()))?;

    let stem = match payload_name.strip_suffix(extension) {
        Some(stem) if !extension.is_empty() => stem,
        _ => payload_name.as_str(),
    };

    let mut path = root.to_path_buf();
    path.extend(&segments);
    path.push(format!("{stem}.{ENVELOPE_EXTENSION}"));

    Ok(EnvelopeLocation { path, payload_name })
}

fn decode_segment(raw: &str) -> Result<String> {
    let unsafe_segment = || Error::UnsafePath {
        segment: raw.to_string(),
    };

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| unsafe_segment())?;

    if decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains(['/', '\\', '\0'])
    {
        return Err(unsafe_segment());
    }

    Ok(decoded.into_owned())
}
