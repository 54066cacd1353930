//! Link extraction from an HTML directory listing.

use std::sync::LazyLock;

use percent_encoding::{percent_encode, CONTROLS};
use regex::bytes::Regex;

use crate::task::Task;

/// Matches one listing row link and captures its `href` value.
///
/// Unicode mode is off so that any byte but `"` is accepted in the value, valid UTF-8 or not.
#[allow(clippy::expect_used)]
static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i-u)<td align=top><a href="([^"]+)">"#).expect("link regex is valid"));

/// Extract one download task per listing row link, in document order.
///
/// The file name is the `href` value taken verbatim, and the source URL is `root_url` immediately followed by that value,
/// so `root_url` is expected to end with a `/`. Nothing is sanitized here: a file name may well contain path separators.
///
/// An `href` that is not valid UTF-8 is percent-encoded in the source URL, so the exact bytes are requested, while the
/// file name gets replacement characters.
///
/// ```
/// let html = br#"<tr><td align=top><a href="a.txt">a.txt</a></td></tr>"#;
/// let tasks = dirscraper::extract::extract(html, "http://example.com/pub/");
///
/// assert_eq!(tasks[0].filename(), "a.txt");
/// assert_eq!(tasks[0].source_url(), "http://example.com/pub/a.txt");
/// ```
pub fn extract(html: &[u8], root_url: &str) -> Vec<Task> {
    tracing::debug!("Detecting subpaths...");

    LINK_PATTERN
        .captures_iter(html)
        .map(|captures| {
            let href = &captures[1];
            let filename = String::from_utf8_lossy(href);

            let source_url = match std::str::from_utf8(href) {
                Ok(href) => format!("{root_url}{href}"),
                Err(_) => format!("{root_url}{}", percent_encode(href, CONTROLS)),
            };

            Task::new(filename.into_owned(), source_url)
        })
        .collect()
}
