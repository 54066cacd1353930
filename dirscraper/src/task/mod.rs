//! This module provides the download task type, the bounded task queue and the worker pool draining it.

mod pool;
pub use pool::*;

pub mod queue;

/// A single file to download.
///
/// Tasks are immutable once created and are consumed exactly once by exactly one worker.
/// There is no identity beyond the fields: two tasks with the same file name are processed independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// File name under the target directory, taken verbatim from the listing.
    filename: String,
    /// Full URL to download the file from.
    source_url: String,
}

impl Task {
    /// Create a new `Task`.
    pub fn new(filename: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source_url: source_url.into(),
        }
    }

    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[inline]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Build a new `Task` storing the same source under another file name.
    #[inline]
    pub(crate) fn with_filename(self, filename: String) -> Self {
        Self { filename, ..self }
    }
}
