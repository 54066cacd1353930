//! This module provides the fetching seam: anything able to turn a URL into bytes.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub use reqwest::{Client, StatusCode};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to fetch `{url}`")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch `{url}`: HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to read `{url}`")]
    Read {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("timed out fetching `{url}` after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Fetcher interface.
///
/// A fetcher is shared by every worker, so it must be safe to call concurrently.
pub trait Fetcher: Send + Sync + 'static {
    /// Download the whole resource at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// Fetch `url` with `fetcher`, giving up after `timeout`.
pub async fn fetch_with_timeout<F: Fetcher>(fetcher: &F, url: &str, timeout: Duration) -> Result<Bytes, FetchError> {
    tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .unwrap_or_else(|_| Err(FetchError::Timeout { url: url.to_owned(), timeout }))
}

/// Plain HTTP GET fetcher.
///
/// The inner client is cheaply cloneable and pools connections, so a single instance should be shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_client(self, client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl { url: url.to_owned(), source })?;

        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| FetchError::Network { url: url.to_owned(), source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_owned(), status });
        }

        resp.bytes().await.map_err(|source| FetchError::Read { url: url.to_owned(), source })
    }
}


#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::stub::StubFetcher;
    use super::*;

    #[tokio::test]
    async fn test_http_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"alpha".as_slice()))
            .mount(&server)
            .await;

        let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();
        let fetcher = HttpFetcher::new().with_client(client);

        let body = fetcher.fetch(&format!("{}/files/a.txt", server.uri())).await.unwrap();
        assert_eq!(body, "alpha");

        let err = fetcher.fetch(&format!("{}/files/missing.txt", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: StatusCode::NOT_FOUND, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_http_fetch_invalid_url() {
        let err = HttpFetcher::new().fetch("").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_with_timeout() {
        let fetcher = StubFetcher::default()
            .with_page("http://listing/slow.bin", "slow")
            .with_delay(Duration::from_millis(200));

        let err = fetch_with_timeout(&fetcher, "http://listing/slow.bin", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { ref url, .. } if url == "http://listing/slow.bin"), "{err:?}");

        let body = fetch_with_timeout(&fetcher, "http://listing/slow.bin", Duration::from_secs(5)).await.unwrap();
        assert_eq!(body, "slow");
    }
}
