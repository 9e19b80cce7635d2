//! Run configuration.
//!
//! Sources are layered with [`figment`], later ones winning:
//! built-in defaults, a TOML file, `GOVBULK_*` environment variables
//! (`__` separates nested keys, e.g. `GOVBULK_HTTP__CONNECT_TIMEOUT_SECS`)
//! and finally command-line [`Overrides`].

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use govbulk_fetch::ClientSetting;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// File read when no `--config` is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "govbulk.toml";

pub const ENV_PREFIX: &str = "GOVBULK_";

pub const DEFAULT_ROOT_URL: &str = "https://www.gpo.gov/fdsys/bulkdata";

pub const DEFAULT_BASE_URL: &str = "https://www.gpo.gov/fdsys/";

pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{0}' does not exist")]
    MissingFile(PathBuf),

    #[error(transparent)]
    Figment(#[from] figment::Error),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("{field} '{value}' is not a valid URL")]
    InvalidUrl {
        field:  &'static str,
        value:  String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must be an http or https URL, got '{url}'")]
    UnsupportedScheme { field: &'static str, url: Url },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listing page the crawl starts from.
    pub root_url:          String,
    /// URL that row links are resolved against.
    pub base_url:          String,
    /// Root of the mirrored envelope tree.
    pub output_dir:        PathBuf,
    /// Gate capacity for each phase.
    pub concurrency:       usize,
    /// Replace envelopes that fail to parse instead of reporting them.
    pub overwrite_corrupt: bool,
    pub http:              ClientSetting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_url:          DEFAULT_ROOT_URL.to_string(),
            base_url:          DEFAULT_BASE_URL.to_string(),
            output_dir:        PathBuf::from("."),
            concurrency:       DEFAULT_CONCURRENCY,
            overwrite_corrupt: false,
            http:              ClientSetting::default(),
        }
    }
}

/// Command-line values; `None` leaves the lower layers alone.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_url:          Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url:          Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir:        Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency:       Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_corrupt: Option<bool>,
}

impl Config {
    /// Loads and validates the layered configuration.
    ///
    /// An explicit `file` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is
    /// read when present.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: Self = Self::figment(&file).merge(Serialized::defaults(overrides)).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        self.root_url()?;
        self.base_url()?;
        Ok(())
    }

    pub fn root_url(&self) -> Result<Url, ConfigError> { parse_http_url("root_url", &self.root_url) }

    pub fn base_url(&self) -> Result<Url, ConfigError> { parse_http_url("base_url", &self.base_url) }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme { field, url });
    }
    Ok(url)
}
