//! HTTP retrieval with stall detection and bounded retries.
//!
//! Uses async reqwest internally with `tokio::time::timeout` around every
//! body chunk, but presents a sync interface for compatibility with rayon
//! workers.

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::ProgressBar;
use thiserror::Error;

use crate::progress::upgrade_to_bar;
use crate::retry::{RetryPolicy, Retryable, retry_with_backoff};

/// Upper bound for pre-allocating a body from its Content-Length
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Runtime HTTP settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Stall timeout: maximum wait for response headers or the next body chunk
    pub read_timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry
    pub base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl HttpConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
        }
    }
}

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("read timeout ({0:?} with no data)")]
    ReadTimeout(Duration),
    #[error("body read failed: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl FetchCause {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_builder() || e.is_redirect() {
            Self::Request(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Connect(e.to_string())
        }
    }
}

impl Retryable for FetchCause {
    fn is_retryable(&self) -> bool {
        match self {
            // Rate limiting and gateway/server hiccups; every other status is final
            Self::Status(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Connect(_) | Self::ReadTimeout(_) | Self::Body(_) => true,
            Self::Request(_) => false,
        }
    }
}

/// Retrieval failure after the retry budget was spent (or a terminal error)
#[derive(Debug, Error)]
#[error("{url}: {cause} (after {attempts} attempt(s))")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    /// HTTP status of the final attempt, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self.cause {
            FetchCause::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Pooled HTTP client with the retry policy from [`HttpConfig`]
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: HttpConfig,
}

impl Fetcher {
    pub fn new(config: HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .user_agent(concat!("lawmirror/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GET `url` and return the full body.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_with_progress(url, &ProgressBar::hidden())
    }

    /// GET `url`, reporting downloaded bytes on `pb`.
    ///
    /// Blocks the calling thread, including backoff sleeps between retries.
    pub fn fetch_with_progress(&self, url: &str, pb: &ProgressBar) -> Result<Vec<u8>, FetchError> {
        let mut attempts = 0u32;
        let result = retry_with_backoff(url, &self.config.retry_policy(), pb, || {
            attempts += 1;
            pb.set_position(0);
            SHARED_RUNTIME.handle().block_on(self.fetch_once(url, pb))
        });
        result.map_err(|cause| FetchError {
            url: url.to_string(),
            attempts,
            cause,
        })
    }

    async fn fetch_once(&self, url: &str, pb: &ProgressBar) -> Result<Vec<u8>, FetchCause> {
        let read_timeout = self.config.read_timeout;

        let response = tokio::time::timeout(read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchCause::ReadTimeout(read_timeout))?
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchCause::from_reqwest(&e))?;

        let total_bytes = response.content_length();
        if let Some(total) = total_bytes {
            upgrade_to_bar(pb, total);
        }
        let mut body = Vec::with_capacity(total_bytes.unwrap_or(0).min(MAX_PREALLOC) as usize);

        let mut stream = response.bytes_stream();
        loop {
            match tokio::time::timeout(read_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => {
                    pb.inc(chunk.len() as u64);
                    body.extend_from_slice(&chunk);
                }
                Ok(Some(Err(e))) => return Err(FetchCause::Body(e.to_string())),
                Ok(None) => break,
                Err(_) => return Err(FetchCause::ReadTimeout(read_timeout)),
            }
        }

        Ok(body)
    }
}
