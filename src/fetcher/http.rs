//! OKX HTTP client helper
//!
//! Thin wrapper around `reqwest` that performs a single request attempt and
//! classifies failures into the [`FetchError`] taxonomy. Retrying is the
//! caller's job ([`crate::fetcher::PageFetcher`]), which keeps the cursor
//! state out of the transport layer.

use crate::fetcher::{FetchError, FetchResult};
use reqwest::{Client, Proxy, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default OKX REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";

/// TCP connect timeout per request.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Overall timeout per request. Applies per network call, not per unit.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for OKX REST endpoints.
#[derive(Clone)]
pub struct OkxHttpClient {
    client: Client,
    base_url: String,
}

impl OkxHttpClient {
    /// Build a client, optionally routing through an outbound proxy.
    pub fn new(proxy: Option<&str>) -> FetchResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, proxy)
    }

    /// Build a client against a custom base URL (used by tests).
    pub fn with_base_url(base_url: impl Into<String>, proxy: Option<&str>) -> FetchResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT);

        if let Some(url) = proxy {
            let proxy = Proxy::all(url)
                .map_err(|e| FetchError::Client(format!("Invalid proxy URL {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Client(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Execute one GET request and return the JSON body.
    ///
    /// Classification:
    /// - network failures, timeouts and 5xx → [`FetchError::Transient`]
    /// - 429 → [`FetchError::RateLimited`] with any `Retry-After` hint
    /// - other 4xx → [`FetchError::Client`]
    /// - undecodable body → [`FetchError::Parse`]
    pub async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> FetchResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, params = params.len(), "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            return Err(FetchError::RateLimited { retry_after });
        }

        if status.is_server_error() {
            return Err(FetchError::Transient(format!("server error: {status}")));
        }

        if status.is_client_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FetchError::Client(format!("{status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Parse(format!("Failed to decode response body: {e}")))
    }
}

/// Parse a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let secs: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}
