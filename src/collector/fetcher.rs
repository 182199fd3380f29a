//! HTTP fetcher implementation
//!
//! This module issues the collector's network requests:
//! - Building HTTP clients with the configured timeouts and user agent
//! - Volumes API requests with 429 backoff and 403 key remediation
//! - Catalog page requests with exponential retry on any failure
//! - Best-effort extraction of server error messages for the log
//!
//! Fetch failures never escape as errors of the whole run. Callers receive a
//! [`FetchFailure`] and treat it as "no page".

use crate::collector::pacing::{Sleeper, TokioSleeper};
use crate::config::HttpConfig;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Longest server error body excerpt written to the log
const ERROR_EXCERPT_CHARS: usize = 500;

/// Why a fetch produced no page
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("HTTP {status}{}", detail_suffix(.message))]
    Http { status: u16, message: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - Shared HTTP settings (user agent, connect timeout)
/// * `timeout` - Whole-request timeout for this client
///
/// # Example
///
/// ```no_run
/// use biblio_harvest::collector::build_http_client;
/// use biblio_harvest::config::HttpConfig;
/// use std::time::Duration;
///
/// let client = build_http_client(&HttpConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher for the JSON volumes API
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 429 | Wait `backoff_base * 2^n` before retry `n + 1`, up to `max_retries` |
/// | HTTP 403 with a key | One extra attempt without the key |
/// | Other HTTP errors | Log server message, fail |
/// | Transport error | Log, fail |
/// | Body is not JSON | Log, fail |
pub struct ApiFetcher<S = TokioSleeper> {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base: Duration,
    sleeper: S,
}

impl<S: Sleeper> ApiFetcher<S> {
    pub fn new(
        client: Client,
        base_url: Url,
        api_key: Option<String>,
        max_retries: u32,
        backoff_base: Duration,
        sleeper: S,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            max_retries,
            backoff_base,
            sleeper,
        }
    }

    /// Wait before retry number `retry + 1`
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << retry.min(31))
    }

    /// Fetches one page of volumes for `query` starting at `start_index`
    pub async fn fetch(
        &self,
        query: &str,
        start_index: usize,
        max_results: usize,
    ) -> Result<serde_json::Value, FetchFailure> {
        let mut retry = 0;

        loop {
            let response = self
                .send(query, start_index, max_results, self.api_key.as_deref())
                .await
                .map_err(|e| {
                    tracing::error!("API request for '{}' failed: {}", query, e);
                    FetchFailure::Transport(e.to_string())
                })?;

            let status = response.status();
            if status.is_success() {
                return decode_json(response).await;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retry < self.max_retries {
                    let wait = self.backoff_for(retry);
                    tracing::warn!(
                        "Rate limited (429); waiting {}s before retry {}/{}",
                        wait.as_secs(),
                        retry + 1,
                        self.max_retries
                    );
                    self.sleeper.sleep(wait).await;
                    retry += 1;
                    continue;
                }

                tracing::error!(
                    "Still rate limited after {} retries, skipping request for '{}'",
                    self.max_retries,
                    query
                );
                return Err(FetchFailure::RateLimited {
                    attempts: retry + 1,
                });
            }

            if status == StatusCode::FORBIDDEN && self.api_key.is_some() {
                tracing::warn!("API key rejected (403), retrying once without it");
                if let Some(payload) = self.fetch_anonymous(query, start_index, max_results).await {
                    return Ok(payload);
                }
            }

            let message = server_error_message(response).await;
            tracing::error!(
                "API request for '{}' failed with HTTP {}",
                query,
                status.as_u16()
            );
            if let Some(message) = &message {
                tracing::error!("Error details: {}", message);
            }
            return Err(FetchFailure::Http {
                status: status.as_u16(),
                message,
            });
        }
    }

    /// The single keyless remediation attempt after a 403
    async fn fetch_anonymous(
        &self,
        query: &str,
        start_index: usize,
        max_results: usize,
    ) -> Option<serde_json::Value> {
        let response = match self.send(query, start_index, max_results, None).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Anonymous retry failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Anonymous retry returned HTTP {}", response.status());
            return None;
        }

        decode_json(response).await.ok()
    }

    async fn send(
        &self,
        query: &str,
        start_index: usize,
        max_results: usize,
        api_key: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
            ("startIndex", start_index.to_string()),
        ];
        if let Some(key) = api_key {
            params.push(("key", key.to_string()));
        }

        tracing::debug!("GET {} q={} startIndex={}", self.base_url, query, start_index);
        self.client
            .get(self.base_url.clone())
            .query(&params)
            .send()
            .await
    }
}

/// Fetcher for catalog HTML pages
///
/// Any transport error or non-success status is retried after
/// `backoff_base * 2^n`, up to `max_retries` times. Exhausting the budget
/// fails this page only.
pub struct HtmlFetcher<S = TokioSleeper> {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
    sleeper: S,
}

impl<S: Sleeper> HtmlFetcher<S> {
    pub fn new(client: Client, max_retries: u32, backoff_base: Duration, sleeper: S) -> Self {
        Self {
            client,
            max_retries,
            backoff_base,
            sleeper,
        }
    }

    /// Fetches the body of `url`
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchFailure> {
        let mut retry = 0;

        loop {
            tracing::debug!("GET {}", url);
            let error = match self
                .client
                .get(url.clone())
                .send()
                .await
                .and_then(Response::error_for_status)
            {
                Ok(response) => match response.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if retry >= self.max_retries {
                tracing::error!("Request to {} failed: {}", url, error);
                return Err(FetchFailure::Exhausted {
                    attempts: retry + 1,
                    last_error: error.to_string(),
                });
            }

            tracing::warn!(
                "Request to {} failed, retry {}/{}",
                url,
                retry + 1,
                self.max_retries
            );
            self.sleeper
                .sleep(self.backoff_base.saturating_mul(1u32 << retry.min(31)))
                .await;
            retry += 1;
        }
    }
}

async fn decode_json(response: Response) -> Result<serde_json::Value, FetchFailure> {
    let body = response.text().await.map_err(|e| {
        tracing::error!("Failed to read API response body: {}", e);
        FetchFailure::Transport(e.to_string())
    })?;

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("API response is not valid JSON: {}", e);
        FetchFailure::Malformed(e.to_string())
    })
}

/// Pulls a human-readable message out of an error response
///
/// Prefers the JSON `error.message` field and falls back to the start of the
/// raw body.
async fn server_error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    error_message_from_body(&body)
}

fn error_message_from_body(body: &str) -> Option<String> {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string));

    from_json.or_else(|| {
        let excerpt: String = body.trim().chars().take(ERROR_EXCERPT_CHARS).collect();
        (!excerpt.is_empty()).then_some(excerpt)
    })
}
