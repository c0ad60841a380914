// src/share/client.rs
// =============================================================================
// The HTTP session shared by every request of one run.
//
// One `ShareClient` is built at startup and passed down (by reference) to the
// walk and to every download. It owns:
// - the reqwest Client (connection pool + cookie store for the session)
// - the share's URL scheme
// - the retry policy
//
// Requests are made one at a time; nothing here spawns tasks.
//
// Retry rules:
// - transport errors (timeout, connection refused, ...) are retried
// - 5xx and 429 responses are retried
// - any other non-success status fails immediately (retrying a 404 is pointless)
// =============================================================================

use crate::error::RequestError;
use crate::share::ShareUrls;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// How often and how patiently a GET is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one (at least 1)
    pub tries: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 5,
            delay: Duration::from_secs(10),
        }
    }
}

/// Authenticated session for one share
#[derive(Debug, Clone)]
pub struct ShareClient {
    http: Client,
    urls: ShareUrls,
    retry: RetryPolicy,
}

impl ShareClient {
    /// Builds the session with a per-request timeout
    pub fn new(urls: ShareUrls, retry: RetryPolicy, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, urls, retry })
    }

    pub fn urls(&self) -> &ShareUrls {
        &self.urls
    }

    /// GETs a URL, retrying transient failures, and returns the successful response
    ///
    /// The body is not read here: listings call `.text()`, downloads stream it.
    pub async fn get(&self, url: &Url) -> Result<Response, RequestError> {
        let tries = self.retry.tries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url = %url, attempt, "GET");

            match self.http.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable(status) || attempt >= tries {
                        return Err(RequestError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    warn!(url = %url, status = status.as_u16(), attempt, "non-success status, retrying");
                }
                Err(source) => {
                    if attempt >= tries {
                        return Err(RequestError::Network {
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    if source.is_timeout() {
                        warn!(url = %url, attempt, "timed out, retrying");
                    } else {
                        warn!(url = %url, attempt, error = %source, "request failed, retrying");
                    }
                }
            }

            tokio::time::sleep(self.retry.delay).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
