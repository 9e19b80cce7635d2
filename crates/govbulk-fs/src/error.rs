use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create directory '{path}'")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to stage '{path}'")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}'")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to commit '{path}'")]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{0}' has no parent directory")]
    NoParent(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
