//! Fetching raw markup for a record's address.
//!
//! Addresses on the configured code hosting provider (GitHub by default) point at a repository
//! page rather than a site, so they are rewritten to the raw-content URL of a fixed file on a
//! fixed branch. Every other address is fetched as-is.
use crate::config::RawHostRewrite;
use std::time::Duration;
use url::Url;

/// Default cap on a fetched body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Why an address produced no content.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The request did not complete within the fetch timeout.
    #[error("timed out fetching {0}")]
    Timeout(String),

    /// The server answered with a non-success status, e.g. 404 for a missing page.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Any other transport failure: DNS, connection refused, TLS, an unreadable body.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The address is not a URL the fetcher can request.
    #[error("invalid address {0}")]
    InvalidAddress(String),

    /// The response body is larger than the fetcher accepts.
    #[error("body of {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

impl FetchError {
    /// Whether the site could not be reached at all, as opposed to answering with something
    /// unusable.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Network { .. })
    }
}

/// A source of raw markup, keyed by record address.
#[async_trait::async_trait]
pub trait SiteFetch {
    async fn fetch(&self, address: &str) -> Result<String, FetchError>;
}

/// Fetches record addresses over HTTP(S) with a per-request timeout.
#[derive(Debug, Clone)]
pub struct SiteFetcher {
    client: reqwest::Client,
    rewrite: RawHostRewrite,
    max_body_bytes: usize,
}

impl SiteFetcher {
    /// Build a fetcher whose every request is bounded by `timeout`, from connect through the end
    /// of the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client can't be constructed.
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        rewrite: RawHostRewrite,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(SiteFetcher {
            client,
            rewrite,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Reject bodies larger than `bytes` instead of reading them into memory.
    #[must_use]
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// The URL actually requested for `address`.
    pub fn resolve(&self, address: &str) -> String {
        self.rewrite
            .raw_url(address)
            .unwrap_or_else(|| address.to_string())
    }
}

#[async_trait::async_trait]
impl SiteFetch for SiteFetcher {
    async fn fetch(&self, address: &str) -> Result<String, FetchError> {
        let url = self.resolve(address);
        if Url::parse(&url).is_err() {
            return Err(FetchError::InvalidAddress(url));
        }

        let network_err = |url: &str, e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    source: e,
                }
            }
        };

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_err(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let too_large = |url: String| FetchError::TooLarge {
            url,
            limit: self.max_body_bytes,
        };
        let limit = u64::try_from(self.max_body_bytes).unwrap_or(u64::MAX);
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(too_large(url));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| network_err(&url, e))? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl RawHostRewrite {
    /// Rewrite `https://<host>/<owner>/<repo>...` to
    /// `<raw_base>/<owner>/<repo>/<branch>/<file>`, or `None` if `address` isn't on the host.
    pub fn raw_url(&self, address: &str) -> Option<String> {
        let prefix = format!("https://{}/", self.host);
        let rest = address.strip_prefix(&prefix)?;
        let mut parts = rest.split('/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        Some(format!(
            "{}/{owner}/{repo}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.branch,
            self.file
        ))
    }
}
