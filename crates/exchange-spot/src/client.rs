//! Spot REST API client with rate limiting.
//!
//! Covers the three public endpoints the scanner needs: best bid/ask for all
//! symbols, order book depth for one symbol, and per-symbol trading status.
//! Every request waits on a governor rate limiter first.
//!
//! # Example
//!
//! ```ignore
//! use venue_arb_spot::{SpotClientConfig, SpotRestClient};
//!
//! let client = SpotRestClient::new(SpotClientConfig::new("https://api.mexc.com"))?;
//! let tickers = client.get_book_tickers().await?;
//! let depth = client.get_depth("BTCUSDT", 100).await?;
//! ```

use crate::error::{Result, SpotError};
use crate::types::{BookTicker, DepthSnapshot, ExchangeInfo};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;
use venue_arb_core::VenueConfig;

// =============================================================================
// Constants
// =============================================================================

pub const BOOK_TICKER_PATH: &str = "/api/v3/ticker/bookTicker";
pub const DEPTH_PATH: &str = "/api/v3/depth";
pub const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the spot REST client.
#[derive(Debug, Clone)]
pub struct SpotClientConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SpotClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            requests_per_minute: nonzero!(600u32),
            timeout_secs: 10,
        }
    }
}

impl SpotClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Builds the client configuration for a configured venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the venue has no base URL or a zero rate limit.
    pub fn from_venue(venue: &VenueConfig) -> Result<Self> {
        if venue.base_url.trim().is_empty() {
            return Err(SpotError::Configuration(format!(
                "venue {} has no base_url",
                venue.name
            )));
        }
        let requests_per_minute = NonZeroU32::new(venue.requests_per_minute).ok_or_else(|| {
            SpotError::Configuration(format!("venue {} has a zero rate limit", venue.name))
        })?;

        Ok(Self::new(venue.base_url.as_str())
            .with_rate_limit(requests_per_minute)
            .with_timeout_secs(venue.timeout_secs))
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// =============================================================================
// SpotRestClient
// =============================================================================

/// Public spot REST API client.
pub struct SpotRestClient {
    config: SpotClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for SpotRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotRestClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl SpotRestClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: SpotClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpotError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Rejects symbols that could escape the query string.
    ///
    /// Venue symbols are alphanumeric with optional `_` or `-` separators.
    fn validate_symbol(symbol: &str) -> Result<&str> {
        if symbol.is_empty() {
            return Err(SpotError::InvalidSymbol("symbol cannot be empty".to_string()));
        }

        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SpotError::InvalidSymbol(symbol.to_string()));
        }

        if symbol.len() > 32 {
            return Err(SpotError::InvalidSymbol(format!(
                "symbol exceeds 32 characters: {symbol}"
            )));
        }

        Ok(symbol)
    }

    /// Waits for the rate limiter and makes a GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, params = query.len(), "GET");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handles API response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 || status.as_u16() == 418 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(SpotError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SpotError::api(status.as_u16(), text));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Market Data Endpoints
    // =========================================================================

    /// Gets the best bid and ask for every symbol the venue lists.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_book_tickers(&self) -> Result<Vec<BookTicker>> {
        self.get(BOOK_TICKER_PATH, &[]).await
    }

    /// Gets up to `limit` levels per side for one symbol.
    ///
    /// # Errors
    /// Returns error if the symbol is invalid or the API call fails.
    pub async fn get_depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot> {
        let symbol = Self::validate_symbol(symbol)?;
        self.get(
            DEPTH_PATH,
            &[("symbol", symbol.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Gets trading rules and status for every symbol.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_exchange_info(&self) -> Result<ExchangeInfo> {
        self.get(EXCHANGE_INFO_PATH, &[]).await
    }
}
