//! The run itself: list, enqueue, download, wait.

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::Arc;

use thiserror::Error;

use crate::download::{Manager, Report, Summary};
use crate::fetch::{self, FetchError, Fetcher};
use crate::options::Options;
use crate::task::{queue, Pool, PoolError, Task};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot fetch root listing")]
    RootFetch(#[source] FetchError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Download every file linked from the listing at `options.root_url()` into `options.target_dir()`.
///
/// Only a failure to fetch the listing itself aborts the run. Every other failure is isolated to its own file, logged and
/// accounted for in the returned [`Summary`].
pub async fn run<F: Fetcher>(options: &Options, fetcher: F) -> Result<Summary, Error> {
    tracing::info!("Downloading {}", options.root_url());

    let html = fetch::fetch_with_timeout(&fetcher, options.root_url(), options.fetch_timeout())
        .await
        .map_err(Error::RootFetch)?;

    let links = crate::extract::extract(&html, options.root_url());
    tracing::info!("{} files", links.len());

    let (tasks, skipped) = prepare(links);

    let manager = Arc::new(Manager::new(fetcher, options.target_dir().to_path_buf()).with_timeout(options.fetch_timeout()));

    let (sender, receiver) = queue::channel(options.queue_capacity());
    let pool = Pool::start(options.workers(), receiver, {
        let manager = Arc::clone(&manager);
        move |worker, task| {
            let manager = Arc::clone(&manager);
            async move { manager.process(worker, task).await }
        }
    });

    for task in tasks {
        // receivers only go away once every worker is gone, which `join` reports below
        if let Err(queue::SendError(task)) = sender.enqueue(task).await {
            tracing::error!("No worker left, dropping `{}` and remaining tasks", task.filename());
            break;
        }
    }

    tracing::info!("Closing...");
    sender.close();

    let processed = pool.join().await?;
    tracing::debug!("Tasks processed per worker: {processed:?}");

    let summary = Summary {
        skipped,
        ..manager.summary()
    };

    tracing::info!(
        "{} downloaded ({} bytes), {} failed, {} skipped",
        summary.downloaded,
        summary.bytes,
        summary.failed(),
        summary.skipped
    );

    Ok(summary)
}

/// Drop tasks whose file name would escape the target directory and rename colliding ones.
///
/// A repeated file name gets a `.1`, `.2`, ... suffix so that no download silently replaces another one.
/// Returns the tasks to run and the number of dropped ones.
fn prepare(links: Vec<Task>) -> (Vec<Task>, usize) {
    let mut used = HashSet::with_capacity(links.len());
    let mut tasks = Vec::with_capacity(links.len());
    let mut skipped = 0;

    for task in links {
        if !is_plain_filename(task.filename()) {
            tracing::warn!("Skipping `{}`: not a plain file name", task.filename());
            skipped += 1;
            continue;
        }

        let mut filename = task.filename().to_owned();
        let mut index = 0;

        while used.contains(&filename) {
            index += 1;
            filename = format!("{}.{index}", task.filename());
        }

        if index > 0 {
            tracing::warn!("Duplicate file name `{}`, storing it as `{filename}`", task.filename());
        }

        used.insert(filename.clone());
        tasks.push(task.with_filename(filename));
    }

    (tasks, skipped)
}

/// Whether `filename` names an entry directly inside a directory.
fn is_plain_filename(filename: &str) -> bool {
    if filename.contains(['/', '\\']) {
        return false;
    }

    let mut components = Path::new(filename).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

impl Error {
    /// Format this error followed by its chain of sources.
    pub fn report(&self) -> String {
        Report(self).to_string()
    }
}
