use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

const STAGING_PREFIX: &str = ".";
const STAGING_SUFFIX: &str = ".tmp";

#[cfg(unix)]
const COMMITTED_MODE: u32 = 0o644;

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// A file being written in the destination's directory under a hidden
/// temporary name.
pub struct StagedFile {
    tmp:         NamedTempFile,
    destination: PathBuf,
}

impl StagedFile {
    /// Stages a replacement for `destination`, creating its parent
    /// directories.
    pub fn new(destination: impl AsRef<Path>) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::NoParent(destination.clone()))?;
        ensure_dir(parent)?;

        let tmp = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(parent)
            .map_err(|source| Error::Stage {
                path: destination.clone(),
                source,
            })?;

        Ok(Self { tmp, destination })
    }

    pub fn file_mut(&mut self) -> &mut File { self.tmp.as_file_mut() }

    /// Makes the staged content durable, then renames it over the
    /// destination.
    ///
    /// The data is synced before the rename and the directory entry after
    /// it, so after a crash the destination holds either the old content or
    /// the complete new content.
    pub fn commit(self) -> Result<()> {
        let Self { tmp, destination } = self;

        let write_err = |source| Error::Write {
            path: tmp.path().to_path_buf(),
            source,
        };

        tmp.as_file().flush().map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(COMMITTED_MODE))
                .map_err(write_err)?;
        }

        tmp.persist(&destination).map_err(|e| Error::Commit {
            path: destination.clone(),
            source: e.error,
        })?;

        #[cfg(unix)]
        {
            if let Some(parent) = destination.parent() {
                File::open(parent)
                    .and_then(|dir| dir.sync_all())
                    .map_err(|source| Error::Commit {
                        path: destination.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }
}
