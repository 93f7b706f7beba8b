//! Remote stylesheet fetching with a per-attempt timeout and immediate retries.

use core::error::Error;
use core::fmt::{Display, Formatter, Result as FmtResult};
use core::time::Duration;
use log::debug;
use reqwest::{Client, Error as HttpError, StatusCode};
use tokio::fs::read_to_string as tokio_fs_read_to_string;
use tokio::time::timeout;
use url::Url;

/// Default time allowed for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default number of attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Why a stylesheet could not be fetched. Reported for the last failed attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete within the per-attempt timeout.
    Timeout { url: Url, timeout: Duration },
    /// Connection or transport failure.
    Network { url: Url, message: String },
    /// The server answered with a status other than 200.
    Status { url: Url, status: u16 },
    /// Anything else, including unsupported URL schemes.
    Unknown { url: Url, message: String },
}

impl FetchError {
    pub fn url(&self) -> &Url {
        match self {
            Self::Timeout { url, .. }
            | Self::Network { url, .. }
            | Self::Status { url, .. }
            | Self::Unknown { url, .. } => url,
        }
    }

    fn from_http(url: &Url, err: &HttpError, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.clone(),
                timeout,
            }
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Network {
                url: url.clone(),
                message: err.to_string(),
            }
        } else {
            Self::Unknown {
                url: url.clone(),
                message: err.to_string(),
            }
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Timeout { url, timeout } => write!(
                formatter,
                "Request to \"{url}\" timed out after {} ms",
                timeout.as_millis()
            ),
            Self::Network { url, message } => {
                write!(formatter, "Failed to fetch css file from \"{url}\": {message}")
            }
            Self::Status { url, status } => write!(
                formatter,
                "Unexpected response status \"{status}\" while loading css file from \"{url}\""
            ),
            Self::Unknown { url, message } => write!(
                formatter,
                "Unknown error while loading css file from \"{url}\": {message}"
            ),
        }
    }
}

impl Error for FetchError {}

/// Retry policy for [`HttpFetcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Time allowed for each attempt, including reading the body.
    pub timeout: Duration,
    /// Total number of attempts; values below 1 are treated as 1.
    pub attempts: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

/// Source of raw stylesheet text.
pub trait SourceFetcher: Send + Sync {
    /// Fetch the UTF-8 text behind `url`.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches `http`/`https` URLs with `GET`, and `file` URLs from disk.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            client: Client::new(),
            options,
        }
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    /// One request: anything but a 200 response is a failure.
    async fn attempt(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| FetchError::from_http(url, &err, self.options.timeout))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|err| FetchError::from_http(url, &err, self.options.timeout))
    }

    async fn fetch_http(&self, url: &Url) -> Result<String, FetchError> {
        let attempts = self.options.attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match timeout(self.options.timeout, self.attempt(url)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(FetchError::Timeout {
                    url: url.clone(),
                    timeout: self.options.timeout,
                }),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(err) if attempt < attempts => {
                    debug!("Fetch attempt {attempt}/{attempts} failed: {err}");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_file(url: &Url) -> Result<String, FetchError> {
        let path = url.to_file_path().map_err(|()| FetchError::Unknown {
            url: url.clone(),
            message: String::from("Invalid file path for file url"),
        })?;
        tokio_fs_read_to_string(path)
            .await
            .map_err(|err| FetchError::Network {
                url: url.clone(),
                message: err.to_string(),
            })
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => Self::fetch_file(url).await,
            scheme => Err(FetchError::Unknown {
                url: url.clone(),
                message: format!("Unsupported url scheme {scheme}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(text: &str) -> Option<Url> {
        Url::parse(text).ok()
    }

    #[test]
    fn messages_name_the_url_and_cause() {
        let Some(source) = url("https://example.com/theme.css") else {
            return;
        };
        let status = FetchError::Status {
            url: source.clone(),
            status: 404,
        };
        assert_eq!(
            status.to_string(),
            "Unexpected response status \"404\" while loading css file from \"https://example.com/theme.css\""
        );
        let timed_out = FetchError::Timeout {
            url: source.clone(),
            timeout: Duration::from_millis(250),
        };
        assert!(timed_out.to_string().contains("timed out after 250 ms"));
        assert_eq!(timed_out.url(), &source);
    }

    #[tokio::test]
    async fn unsupported_schemes_fail_without_retrying() {
        let Some(source) = url("ftp://example.com/theme.css") else {
            return;
        };
        let result = HttpFetcher::default().fetch(&source).await;
        assert!(matches!(result, Err(FetchError::Unknown { .. })));
    }

    #[test]
    fn attempts_default_to_three() {
        assert_eq!(HttpFetcher::default().options().attempts, 3);
        assert_eq!(
            HttpFetcher::default().options().timeout,
            Duration::from_secs(5)
        );
    }
}
