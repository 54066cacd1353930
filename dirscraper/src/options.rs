use std::num::{NonZeroU8, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::download::DEFAULT_FETCH_TIMEOUT;
use crate::task::queue::QUEUE_CAPACITY;

pub const DEFAULT_WORKERS: NonZeroU8 = unsafe { NonZeroU8::new_unchecked(2) };

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid root URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("target directory `{}` cannot be accessed", path.display())]
    TargetDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("target `{}` is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

/// Run options.
///
/// Immutable for the whole run and shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// URL of the directory listing, file names are appended to it.
    root_url: String,
    /// Existing directory to store downloaded files in.
    target_dir: PathBuf,
    workers: NonZeroU8,
    fetch_timeout: Duration,
    queue_capacity: NonZeroUsize,
}

impl Options {
    pub fn new(root_url: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_url: root_url.into(),
            target_dir: target_dir.into(),
            workers: DEFAULT_WORKERS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            queue_capacity: QUEUE_CAPACITY,
        }
    }

    #[inline]
    pub fn with_workers(self, workers: NonZeroU8) -> Self {
        Self { workers, ..self }
    }

    #[inline]
    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Self { fetch_timeout, ..self }
    }

    #[inline]
    pub fn with_queue_capacity(self, queue_capacity: NonZeroUsize) -> Self {
        Self { queue_capacity, ..self }
    }

    #[inline]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    #[inline]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    #[inline]
    pub fn workers(&self) -> NonZeroU8 {
        self.workers
    }

    #[inline]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    #[inline]
    pub fn queue_capacity(&self) -> NonZeroUsize {
        self.queue_capacity
    }

    /// Check the root URL is well-formed and the target directory exists.
    ///
    /// The target directory is never created.
    pub fn validate(&self) -> Result<(), Error> {
        Url::parse(&self.root_url).map_err(|source| Error::InvalidUrl {
            url: self.root_url.clone(),
            source,
        })?;

        let metadata = std::fs::metadata(&self.target_dir).map_err(|source| Error::TargetDir {
            path: self.target_dir.clone(),
            source,
        })?;

        if !metadata.is_dir() {
            return Err(Error::NotADirectory {
                path: self.target_dir.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::new("http://listing/", "/tmp");

        assert_eq!(options.workers().get(), 2);
        assert_eq!(options.queue_capacity().get(), 10);
        assert_eq!(options.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();

        assert!(Options::new("http://listing/", dir.path()).validate().is_ok());

        let err = Options::new("", dir.path()).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }), "{err:?}");

        let err = Options::new("http://listing/", dir.path().join("missing")).validate().unwrap_err();
        assert!(matches!(err, Error::TargetDir { .. }), "{err:?}");

        let err = Options::new("http://listing/", &file).validate().unwrap_err();
        assert!(matches!(err, Error::NotADirectory { ref path } if *path == file), "{err:?}");
    }
}
