//! A simple crate downloading every file linked from an HTML directory listing.
//!
//! A run is a single producer feeding a fixed-size pool of workers through a bounded queue:
//! - the root listing is fetched and every row link (`<td align=top><a href="...">`) is turned into a [`Task`],
//! - tasks are pushed to a [`queue`](task::queue) of limited capacity, suspending the producer whenever it is full,
//! - each worker of a [`Pool`] pulls tasks one at a time, fetches their source and stores it in the target directory,
//! - once every task has been enqueued the queue is closed, and the run completes when all workers have drained it.
//!
//! Only a failure to fetch the root listing aborts a run. Any other failure (unreachable file, timeout, unwritable target)
//! is isolated to its own task: it is logged through [`tracing`], counted in the run [`Summary`], and the worker moves on.
//!
//! As a **strong hypothesis**, file names are taken verbatim from the listing and must name a plain entry of the target
//! directory: links pointing elsewhere (sub-directories, parent directories, absolute paths) are skipped, and repeated
//! file names are suffixed with an index rather than overwriting each other.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use dirscraper::{HttpFetcher, Options};
//!
//! let options = Options::new("http://mirror.example/pub/", "/tmp/pub").with_workers(4.try_into()?);
//! options.validate()?;
//!
//! let summary = dirscraper::run(&options, HttpFetcher::new()).await?;
//! println!("{} downloaded, {} failed", summary.downloaded, summary.failed());
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod options;
pub mod task;

pub use dispatch::run;
pub use download::Summary;
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use options::Options;
pub use task::{Pool, Task};
