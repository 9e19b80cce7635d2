use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use govbulk::Overrides;

#[derive(Clone, Debug, Parser)]
#[command(name = "govbulk", version, about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Crawl the listing tree, then download every file (default)
    #[command(alias = "r", name = "run")]
    Run,
    /// Crawl only and print each discovered file URL
    #[command(alias = "c", name = "crawl")]
    Crawl,
    /// Show the marker and payload of an envelope
    #[command(alias = "i", name = "inspect")]
    Inspect(InspectArg),
    /// Print the effective configuration as TOML
    #[command(alias = "cfg", name = "config")]
    Config,
}

#[derive(Clone, Debug, Args)]
pub struct InspectArg {
    pub envelope: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file [default: govbulk.toml if present]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listing the crawl starts from
    #[arg(long, global = true, value_name = "URL")]
    pub root_url: Option<String>,

    /// URL row links are resolved against
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory the envelope tree is written under
    #[arg(short, long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum simultaneous requests
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Replace envelopes that cannot be parsed
    #[arg(long, global = true)]
    pub overwrite_corrupt: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            root_url:          self.root_url.clone(),
            base_url:          self.base_url.clone(),
            output_dir:        self.output_dir.clone(),
            concurrency:       self.concurrency,
            overwrite_corrupt: self.overwrite_corrupt.then_some(true),
        }
    }
}
