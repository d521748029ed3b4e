//! HTTP client with rate limiting for the TMDB API
//!
//! This module provides a rate-limited HTTP client that checks the API
//! credential before any request leaves the process and classifies failures
//! into configuration, HTTP status and transport errors.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{MovieError, Result};

/// Base URL for the TMDB v3 API
pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default User-Agent sent with every request
const DEFAULT_USER_AGENT: &str = concat!("movieapp/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "TMDB_API_KEY";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "TMDB_BASE_URL";

/// Environment variable overriding the request timeout (seconds)
pub const TIMEOUT_ENV: &str = "TMDB_TIMEOUT_SECS";

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart
/// to stay under the TMDB request quota.
pub struct RateLimiter {
    /// Minimum interval between requests
    min_interval: Duration,
    /// Timestamp of the last request
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// # Arguments
    /// * `requests_per_second` - Maximum number of requests allowed per second
    ///
    /// # Example
    /// ```
    /// use movieapp_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(20.0); // 20 requests per second
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second.max(f64::EPSILON));
        let now = Instant::now();
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(now.checked_sub(min_interval).unwrap_or(now))),
        }
    }

    /// Acquire permission to make a request
    ///
    /// This method will wait if necessary to ensure the minimum interval
    /// between requests is respected.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            let wait_time = self.min_interval - elapsed;
            sleep(wait_time).await;
        }

        *last = Instant::now();
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Configuration for the TMDB HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root without trailing slash (default: TMDB v3)
    pub base_url: String,
    /// TMDB API key; requests fail with `MissingApiKey` when absent or blank
    pub api_key: Option<String>,
    /// Maximum requests per second (default: 20.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: TMDB_BASE_URL.to_string(),
            api_key: None,
            requests_per_second: 20.0,
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from `TMDB_API_KEY`, `TMDB_BASE_URL` and
    /// `TMDB_TIMEOUT_SECS`, using defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var(API_KEY_ENV).ok();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        if let Some(timeout) = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.timeout_secs = timeout;
        }
        config
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request rate
    pub fn with_requests_per_second(mut self, requests_per_second: f64) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }
}

/// HTTP client for the TMDB API with rate limiting
///
/// This client automatically:
/// - Refuses to send requests without an API key
/// - Limits request rate
/// - Maps non-success statuses to `MovieError::Http`
///
/// It never retries on its own; retry is decided by the paging engine or
/// the user.
pub struct TmdbClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Rate limiter for request throttling
    rate_limiter: RateLimiter,
    /// API root
    base_url: String,
    /// Credential appended to every request
    api_key: Option<String>,
}

impl TmdbClient {
    /// Create a new client with default configuration and no API key
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Arguments
    /// * `config` - Client configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let rate_limiter = RateLimiter::new(config.requests_per_second);

        Ok(Self {
            client,
            rate_limiter,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    /// The API key, if configured and not blank
    ///
    /// # Errors
    /// `MovieError::MissingApiKey` when the key is absent or whitespace
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(MovieError::MissingApiKey)
    }

    /// Fetch a response body from an API path
    ///
    /// # Arguments
    /// * `path` - Path below the API root, may carry a query (e.g. "/movie/popular?page=2")
    ///
    /// # Returns
    /// The response body as a string (possibly empty)
    ///
    /// # Errors
    /// - `MovieError::MissingApiKey` - No credential configured; nothing is sent
    /// - `MovieError::Http` - Server returned a non-success status
    /// - `MovieError::Transport` - Connection failure or timeout
    pub async fn get(&self, path: &str) -> Result<String> {
        let api_key = self.require_api_key()?;
        let url = format!("{}{}", self.base_url, path);

        // Wait for rate limiter before making request
        self.rate_limiter.acquire().await;
        debug!(path, "sending TMDB request");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", api_key)])
            .send()
            .await
            .map_err(|e| MovieError::from(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(path, status = status.as_u16(), "TMDB request failed");
            return Err(MovieError::Http {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MovieError::from(e.without_url()))
    }

    /// Get a reference to the rate limiter (for testing)
    #[cfg(test)]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
