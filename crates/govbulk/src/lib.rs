//! Mirrors a bulk-data listing tree into per-file tar envelopes.
//!
//! A run has two phases. The crawl walks every listing below the root and
//! collects the files it links to; the download then fetches each file and
//! rewrites its envelope only when the server's `Last-Modified` value
//! differs from the stored one. Both phases share one concurrency gate.

mod config;
mod driver;

pub use config::{
    Config, ConfigError, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, DEFAULT_CONFIG_FILE,
    DEFAULT_ROOT_URL, ENV_PREFIX, Overrides,
};
pub use driver::{Driver, ProgressMode, RunReport};
