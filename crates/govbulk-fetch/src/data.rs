use url::Url;

use crate::FetchError;

/// A remote leaf file discovered by the crawler.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileDescriptor {
    pub url: Url,
    /// Extension including its leading dot, e.g. `.xml`.
    pub extension: String,
}

impl FileDescriptor {
    pub fn new(url: Url, extension: impl Into<String>) -> Self {
        Self {
            url,
            extension: extension.into(),
        }
    }
}

/// A unit of work that ended in an error.
#[derive(Debug)]
pub struct TaskFailure {
    pub url: Url,
    pub error: FetchError,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.url, self.error)
    }
}
