//! CLI argument definitions.

use std::num::NonZeroU8;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use dirscraper::Options;

/// Download every file linked from an HTML directory listing.
#[derive(Parser, Debug)]
#[command(name = "dirscraper")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the directory listing, ending with a `/`
    #[arg(short, long)]
    pub url: String,

    /// Existing directory to store downloaded files in
    #[arg(short, long, default_value_os_t = std::env::temp_dir())]
    pub dir: PathBuf,

    /// Number of concurrent workers (1-255)
    #[arg(short, long, default_value_t = dirscraper::options::DEFAULT_WORKERS)]
    pub workers: NonZeroU8,

    /// Seconds allowed for a single file download (1-3600)
    #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default log level, unless overridden by `RUST_LOG`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn into_options(self) -> Options {
        Options::new(self.url, self.dir)
            .with_workers(self.workers)
            .with_fetch_timeout(Duration::from_secs(self.timeout))
    }
}
