mod cli;

use std::error::Error as _;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use govbulk::{Config, Driver, ProgressMode, RunReport};
use govbulk_envelope::open_envelope;
use govbulk_fetch::{ReqwestClient, TaskFailure};
use tracing_subscriber::EnvFilter;

use crate::cli::{App, Commands, InspectArg};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let app = App::parse();

    let level = if app.global.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let load = || {
        Config::load(app.global.config.as_deref(), &app.global.overrides())
            .context("invalid configuration")
    };

    match app.cmd.clone().unwrap_or(Commands::Run) {
        Commands::Inspect(arg) => inspect(&arg),
        Commands::Config => {
            let config = load()?;
            print!("{}", toml::to_string_pretty(&config).context("failed to render configuration")?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Crawl => {
            let report = driver(load()?)?.crawl().await;
            for file in &report.frontier {
                println!("{}", file.url);
            }
            report_failures(report.failures.iter())
        }
        Commands::Run => {
            let report = driver(load()?)?.with_progress(ProgressMode::Stdout).run().await;
            summarize(&report);
            report_failures(report.failures())
        }
    }
}

fn driver(config: Config) -> Result<Driver<ReqwestClient>> {
    let client = ReqwestClient::new(&config.http).context("failed to build HTTP client")?;
    Ok(Driver::new(Arc::new(client), config)?)
}

fn inspect(arg: &InspectArg) -> Result<ExitCode> {
    let summary = open_envelope(&arg.envelope)
        .with_context(|| format!("cannot read envelope '{}'", arg.envelope.display()))?;
    println!("marker:  {}", summary.marker);
    println!("payload: {} ({} bytes)", summary.payload_name, summary.payload_size);
    Ok(ExitCode::SUCCESS)
}

fn summarize(report: &RunReport) {
    let download = &report.download;
    println!();
    println!(
        "listings: {} ok / {} total; files: {} ok / {} total ({} new, {} updated, {} unchanged, {} corrupt replaced)",
        report.crawl.succeeded(),
        report.crawl.total(),
        download.succeeded(),
        download.total,
        download.misses,
        download.stale,
        download.hits,
        download.corrupt_replaced,
    );
}

/// Prints one entry per failed task with its error chain.
fn report_failures<'a>(failures: impl Iterator<Item = &'a TaskFailure>) -> Result<ExitCode> {
    let mut count = 0usize;
    for failure in failures {
        count += 1;
        eprintln!("failed: {failure}");
        let mut source = failure.error.source();
        while let Some(err) = source {
            eprintln!("  caused by: {err}");
            source = err.source();
        }
    }

    if count == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{count} task(s) failed");
        Ok(ExitCode::FAILURE)
    }
}
