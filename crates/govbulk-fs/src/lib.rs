//! Staged filesystem writes.
//!
//! A [`StagedFile`] is created next to its destination under a hidden
//! temporary name and only becomes visible at the destination path when
//! [`StagedFile::commit`] renames it into place. Dropping an uncommitted
//! stage removes the temporary file, so readers see either the previous
//! content or the complete new content, never a partial write.

mod error;
mod staged;

pub use error::{Error, Result};
pub use staged::StagedFile;
