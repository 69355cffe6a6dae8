//! Error types for the spot REST adapter.

use thiserror::Error;
use venue_arb_core::BrokerError;

/// Errors that can occur when talking to a spot REST venue.
#[derive(Debug, Error)]
pub enum SpotError {
    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body, if any.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body did not match the expected shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Symbol rejected before sending the request.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SpotError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. }
        )
    }

    /// Returns true if the request may succeed later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SpotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SpotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SpotError> for BrokerError {
    fn from(err: SpotError) -> Self {
        match err {
            SpotError::Api {
                status_code,
                message,
            } => Self::Api {
                status_code,
                message,
            },
            SpotError::RateLimit { retry_after_secs } => Self::RateLimit { retry_after_secs },
            SpotError::Network(msg) => Self::Network(msg),
            SpotError::Timeout(msg) => Self::Timeout(msg),
            SpotError::Serialization(msg) => Self::Parse(msg),
            SpotError::InvalidSymbol(symbol) => Self::UnknownTicker { symbol },
            SpotError::Configuration(msg) => Self::ConfigurationMissing(msg),
        }
    }
}

/// Result type alias for spot REST operations.
pub type Result<T> = std::result::Result<T, SpotError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Error Construction Tests ====================

    #[test]
    fn test_api_error_construction() {
        let err = SpotError::api(400, "bad request");
        assert!(matches!(err, SpotError::Api { status_code: 400, .. }));
        assert!(err.to_string().contains("bad request"));
    }

    #[test]
    fn test_rate_limit_error_construction() {
        let err = SpotError::rate_limit(30);
        assert!(err.to_string().contains("30"));
        assert!(err.is_retryable());
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_transient_errors() {
        assert!(SpotError::Network("reset".into()).is_transient());
        assert!(SpotError::api(502, "bad gateway").is_transient());
        assert!(!SpotError::api(404, "missing").is_transient());
        assert!(!SpotError::Serialization("eof".into()).is_transient());
    }

    // ==================== Conversion Tests ====================

    #[test]
    fn test_conversion_keeps_classification() {
        let err: BrokerError = SpotError::api(503, "down").into();
        assert!(err.is_transient());

        let err: BrokerError = SpotError::Serialization("bad json".into()).into();
        assert!(matches!(err, BrokerError::Parse(_)));
        assert!(err.is_item_level());

        let err: BrokerError = SpotError::InvalidSymbol("../x".into()).into();
        assert!(matches!(err, BrokerError::UnknownTicker { .. }));
    }
}
