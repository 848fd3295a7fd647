//! HTTP client for regional council websites.
//!
//! Every request carries browser-like headers (several council sites reject
//! the default reqwest user agent) and goes through [`with_retry`], which
//! backs off exponentially on transient failures only.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// How many times a request is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): base, 2×base, 4×base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy runs out.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, url: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt >= attempts => {
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(url, attempt, max = attempts, error = %e, ?delay, "request failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// URL after redirects.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedBody {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()?;
        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// GET with retry, returning the response once the status is a success.
    /// The body is left unread so callers can stream it.
    pub async fn get_response(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        with_retry(&self.retry, url, move || self.get_once(url)).await
    }

    /// GET an HTML page as text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        with_retry(&self.retry, url, move || async move {
            let resp = self.get_once(url).await?;
            Ok(resp.text().await?)
        })
        .await
    }

    /// GET a resource into memory along with the headers the pipeline inspects.
    pub async fn get_body(&self, url: &str) -> Result<FetchedBody, FetchError> {
        with_retry(&self.retry, url, move || async move {
            let resp = self.get_once(url).await?;
            let final_url = resp.url().to_string();
            let status = resp.status().as_u16();
            let content_type = header_string(resp.headers(), header::CONTENT_TYPE);
            let content_disposition = header_string(resp.headers(), header::CONTENT_DISPOSITION);
            let bytes = resp.bytes().await?.to_vec();
            Ok(FetchedBody {
                url: final_url,
                status,
                content_type,
                content_disposition,
                bytes,
            })
        })
        .await
    }

    async fn get_once(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        debug!(url, "GET");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }
}

pub(crate) fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("it-IT,it;q=0.9,en;q=0.8"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}
