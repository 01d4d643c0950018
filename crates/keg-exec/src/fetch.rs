//! Archive download.
//!
//! The executor talks to a [`Fetcher`] so tests can serve archives from
//! memory. [`HttpFetcher`] is the real implementation: blocking `ureq` for
//! `http`/`https` and a plain file read for `file://` URLs.

use std::time::Duration;

use url::Url;

/// Name used when a URL has no usable last path segment.
const FALLBACK_ARCHIVE_NAME: &str = "source.archive";

/// A download failure, reported as `FetchError` by the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Something that can turn a source URL into archive bytes.
pub trait Fetcher {
    /// Download the full body at `url`.
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP(S) and `file://` fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    user_agent: String,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
            max_bytes,
        }
    }

    fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .into();

        let mut response = agent
            .get(url.as_str())
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| self.describe(e))?;

        response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(|e| self.describe(e))
    }

    fn fetch_file(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|()| FetchError::new(format!("not a local file URL: {url}")))?;
        let len = std::fs::metadata(&path)
            .map_err(|e| FetchError::new(format!("{}: {e}", path.display())))?
            .len();
        if len > self.max_bytes {
            return Err(FetchError::new(format!(
                "archive exceeds maximum download size ({} bytes)",
                self.max_bytes
            )));
        }
        std::fs::read(&path).map_err(|e| FetchError::new(format!("{}: {e}", path.display())))
    }

    fn describe(&self, err: ureq::Error) -> FetchError {
        match err {
            ureq::Error::StatusCode(code) => FetchError::new(format!("server returned HTTP {code}")),
            ureq::Error::BodyExceedsLimit(_) => FetchError::new(format!(
                "archive exceeds maximum download size ({} bytes)",
                self.max_bytes
            )),
            other => FetchError::new(other.to_string()),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(%url, "fetching archive");
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "file" => self.fetch_file(url),
            other => Err(FetchError::new(format!("unsupported URL scheme '{other}'"))),
        }
    }
}

/// File name the downloaded archive is stored under inside the work dir.
pub fn archive_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_ARCHIVE_NAME.to_string())
}
