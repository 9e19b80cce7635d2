//! HTTP fetching into cache envelopes under a fixed concurrency ceiling.
//!
//! # Architecture
//!
//! - [`http`] - Client abstraction and the `reqwest` implementation
//! - [`Gate`] - Counting semaphore bounding in-flight requests
//! - [`Archiver`] - Fetches one file and updates its envelope
//! - [`archive_all`] - Runs one archiver task per file and joins them
//! - [`testing`] - In-memory client for tests

mod archiver;
mod batch;
mod data;
mod error;
mod gate;
pub mod http;
mod progress;
pub mod testing;

pub use archiver::{ArchiveOptions, ArchiveOutcome, Archiver};
pub use batch::{DownloadReport, archive_all};
pub use data::{FileDescriptor, TaskFailure};
pub use error::{FetchError, Result};
pub use gate::{Gate, GatePermit};
pub use http::{BoxStream, ClientSetting, ClientSettingError, HttpClient, HttpResponse};
pub use progress::ProgressCounter;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
