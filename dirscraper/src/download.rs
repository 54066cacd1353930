use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::{fs, io};

use crate::fetch::{self, FetchError, Fetcher};
use crate::task::Task;

/// Default time given to a single fetch before it is considered failed.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Download manager.
///
/// Fetches task sources and stores them in a target directory, keeping track of outcomes.
/// It is meant to be shared by every worker of a [`Pool`](crate::task::Pool), failures being isolated to the task at hand.
#[derive(Debug)]
pub struct Manager<F> {
    fetcher: F,
    path: PathBuf,
    timeout: Duration,
    stats: Stats,
}

impl<F: Fetcher> Manager<F> {
    pub fn new(fetcher: F, path: PathBuf) -> Self {
        Self {
            fetcher,
            path,
            timeout: DEFAULT_FETCH_TIMEOUT,
            stats: Stats::default(),
        }
    }

    #[inline]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Download `task` source to the target directory, overwriting any existing file.
    ///
    /// Returns the number of bytes written.
    pub async fn download(&self, task: &Task) -> Result<u64, Error> {
        use io::AsyncWriteExt;

        let bytes = fetch::fetch_with_timeout(&self.fetcher, task.source_url(), self.timeout).await?;

        let path = self.path.join(task.filename());
        let write = async {
            let file = fs::File::options().write(true).create(true).truncate(true).open(&path).await?;

            let mut writer = io::BufWriter::new(file);
            writer.write_all(&bytes).await?;
            writer.shutdown().await?;
            writer.into_inner().sync_all().await
        };

        write.await.map_err(|source| Error::Write { path, source })?;

        Ok(bytes.len() as u64)
    }

    /// Process `task` on behalf of `worker`.
    ///
    /// Failures are logged and counted, never propagated.
    pub async fn process(&self, worker: usize, task: Task) {
        tracing::info!("Worker {worker}, downloading {}", task.source_url());

        match self.download(&task).await {
            Ok(len) => {
                tracing::debug!("Worker {worker}, stored {len} bytes to `{}`", task.filename());
                self.stats.downloaded(len);
            }
            Err(err @ Error::Fetch(_)) => {
                tracing::warn!("Worker {worker}: {}", Report(&err));
                self.stats.fetch_failed();
            }
            Err(err @ Error::Write { .. }) => {
                tracing::warn!("Worker {worker}: {}", Report(&err));
                self.stats.write_failed();
            }
        }
    }

    /// Take a snapshot of the outcomes so far.
    pub fn summary(&self) -> Summary {
        self.stats.snapshot()
    }
}

/// Format an error followed by its chain of sources.
pub(crate) struct Report<'a>(pub(crate) &'a dyn std::error::Error);

impl std::fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;

        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct Stats {
    downloaded: AtomicUsize,
    fetch_failed: AtomicUsize,
    write_failed: AtomicUsize,
    bytes: AtomicU64,
}

impl Stats {
    fn downloaded(&self, len: u64) {
        self.downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len, Ordering::Relaxed);
    }

    fn fetch_failed(&self) {
        self.fetch_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn write_failed(&self) {
        self.write_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Summary {
        Summary {
            downloaded: self.downloaded.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            write_failed: self.write_failed.load(Ordering::Relaxed),
            skipped: 0,
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Files fetched and stored.
    pub downloaded: usize,
    /// Files that could not be fetched.
    pub fetch_failed: usize,
    /// Files fetched but not stored.
    pub write_failed: usize,
    /// Links ignored before download.
    pub skipped: usize,
    /// Total bytes stored.
    pub bytes: u64,
}

impl Summary {
    #[inline]
    pub fn failed(&self) -> usize {
        self.fetch_failed + self.write_failed
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.downloaded + self.failed() + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetch::stub::StubFetcher;
    use crate::task::{queue, Pool};

    const ROOT: &str = "http://listing/";

    #[tokio::test]
    async fn test_download_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a much longer previous content").unwrap();

        let fetcher = StubFetcher::default().with_page("http://listing/a.txt", "alpha");
        let manager = Manager::new(fetcher, dir.path().to_path_buf());
        assert_eq!(manager.path(), dir.path());

        let len = manager.download(&Task::new("a.txt", "http://listing/a.txt")).await.unwrap();

        assert_eq!(len, 5);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let dir = tempfile::tempdir().unwrap();

        let fetcher = StubFetcher::default()
            .with_page("http://listing/slow.bin", "slow")
            .with_delay(Duration::from_millis(200));
        let manager = Manager::new(fetcher, dir.path().to_path_buf()).with_timeout(Duration::from_millis(20));

        let err = manager.download(&Task::new("slow.bin", "http://listing/slow.bin")).await.unwrap_err();

        assert!(matches!(err, Error::Fetch(FetchError::Timeout { .. })), "{err:?}");
        assert!(!dir.path().join("slow.bin").exists());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_write_failure_is_counted() {
        let dir = tempfile::tempdir().unwrap();

        let fetcher = StubFetcher::default().with_page("http://listing/a.txt", "alpha");
        let manager = Manager::new(fetcher, dir.path().join("missing"));

        manager.process(1, Task::new("a.txt", "http://listing/a.txt")).await;

        assert_eq!(
            manager.summary(),
            Summary {
                write_failed: 1,
                ..Default::default()
            }
        );
        assert!(logs_contain("failed to write"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[tracing_test::traced_test]
    async fn test_fetch_failure_does_not_stop_worker() {
        let dir = tempfile::tempdir().unwrap();

        let fetcher = StubFetcher::default()
            .with_page("http://listing/a.txt", "alpha")
            .with_page("http://listing/b.txt", "bravo");
        let manager = Arc::new(Manager::new(fetcher, dir.path().to_path_buf()));

        let (sender, receiver) = queue::channel(queue::QUEUE_CAPACITY);
        let pool = Pool::start(1.try_into().unwrap(), receiver, {
            let manager = Arc::clone(&manager);
            move |worker, task| {
                let manager = Arc::clone(&manager);
                async move { manager.process(worker, task).await }
            }
        });

        for filename in ["gone.txt", "a.txt", "gone-too.txt", "b.txt"] {
            sender.enqueue(Task::new(filename, format!("{ROOT}{filename}"))).await.unwrap();
        }
        sender.close();

        assert_eq!(pool.join().await.unwrap(), [4]);

        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"bravo");
        assert!(!dir.path().join("gone.txt").exists());

        let summary = manager.summary();
        assert_eq!((summary.downloaded, summary.fetch_failed, summary.bytes), (2, 2, 10));
        assert!(logs_contain("HTTP 404 Not Found"));
    }

    #[test]
    fn test_summary_totals() {
        let summary = Summary {
            downloaded: 3,
            fetch_failed: 2,
            write_failed: 1,
            skipped: 4,
            bytes: 0,
        };

        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.total(), 10);
    }
}
