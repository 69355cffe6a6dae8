//! Error types for venue access.
//!
//! Every venue adapter maps its transport and decoding failures onto
//! [`BrokerError`] so the scanner can decide what is transient (skip the pair
//! this cycle) and what is fatal (abort at startup).

use thiserror::Error;

/// Errors that can occur when talking to a venue.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    /// The venue answered but the requested data is missing.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The venue answered with data that could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Ticker is not known to the venue or the catalog.
    #[error("unknown ticker: {symbol}")]
    UnknownTicker {
        /// The venue symbol that was not found.
        symbol: String,
    },

    /// Required configuration is missing or invalid.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
}

impl BrokerError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Creates an unknown ticker error.
    pub fn unknown_ticker(symbol: impl Into<String>) -> Self {
        Self::UnknownTicker {
            symbol: symbol.into(),
        }
    }

    /// Returns true if the error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. }
        )
    }

    /// Returns true if the same request may succeed on a later cycle.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Returns true if the error only affects the item being fetched.
    #[must_use]
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable(_) | Self::Parse(_) | Self::UnknownTicker { .. }
        )
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for venue operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
