//! CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use dirscraper::HttpFetcher;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // parse arguments before installing the subscriber so that --help stays clean
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(?args, "CLI arguments parsed");

    let options = args.into_options();
    options.validate().context("invalid configuration")?;

    // anyhow prints the whole source chain on exit
    dirscraper::run(&options, HttpFetcher::new()).await?;

    Ok(())
}
