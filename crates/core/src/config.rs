use crate::types::{AssetPair, CoinId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerSettings,
    pub poller: PollerSettings,
    pub venues: Vec<VenueConfig>,
    /// Asset pairs tracked on every venue that lists them.
    pub pairs: Vec<AssetPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Bid must exceed `ask * min_profit_ratio` for a fill to count.
    pub min_profit_ratio: Decimal,
    /// Maximum quote currency spent per opportunity.
    pub max_budget: Decimal,
    /// Upper bound on concurrently running per-pair scans.
    pub max_concurrent_scans: usize,
    /// Abort the whole cycle on the first non-transient pair error.
    pub fail_fast: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            min_profit_ratio: dec!(1.1),
            max_budget: dec!(1000),
            max_concurrent_scans: 16,
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    /// Stop after this many cycles. Runs until shutdown when unset.
    pub max_cycles: Option<u64>,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VenueKind {
    /// Binance-compatible public spot REST API.
    #[default]
    SpotRest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub name: String,
    pub kind: VenueKind,
    pub enabled: bool,
    pub base_url: String,
    /// Symbol template, e.g. `"{base}{quote}"` or `"{base}_{quote}"`.
    pub ticker_format: String,
    /// Venue-specific spelling of a coin, when it differs from the coin id.
    pub aliases: BTreeMap<CoinId, String>,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
    pub depth_limit: u32,
    /// Coins whose withdrawals are known to be suspended on this venue.
    pub withdraw_disabled: Vec<CoinId>,
    /// Coins whose deposits are known to be suspended on this venue.
    pub deposit_disabled: Vec<CoinId>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: VenueKind::SpotRest,
            enabled: true,
            base_url: String::new(),
            ticker_format: "{base}{quote}".to_string(),
            aliases: BTreeMap::new(),
            requests_per_minute: 600,
            timeout_secs: 10,
            depth_limit: 100,
            withdraw_disabled: Vec::new(),
            deposit_disabled: Vec::new(),
        }
    }
}

impl VenueConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_ticker_format(mut self, format: impl Into<String>) -> Self {
        self.ticker_format = format.into();
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no venues configured")]
    NoVenues,

    #[error("no asset pairs configured")]
    NoPairs,

    #[error("duplicate venue name: {0}")]
    DuplicateVenue(String),

    #[error("venue {venue}: {reason}")]
    InvalidVenue { venue: String, reason: String },

    #[error("invalid scanner setting: {0}")]
    InvalidScanner(String),
}

impl AppConfig {
    /// Venues that are switched on.
    pub fn enabled_venues(&self) -> impl Iterator<Item = &VenueConfig> {
        self.venues.iter().filter(|v| v.enabled)
    }

    /// Checks the settings that would otherwise only fail mid-cycle.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_venues().next().is_none() {
            return Err(ConfigError::NoVenues);
        }
        if self.pairs.is_empty() {
            return Err(ConfigError::NoPairs);
        }
        if self.scanner.min_profit_ratio <= Decimal::ZERO {
            return Err(ConfigError::InvalidScanner(format!(
                "min_profit_ratio must be positive, got {}",
                self.scanner.min_profit_ratio
            )));
        }
        if self.scanner.max_budget < Decimal::ZERO {
            return Err(ConfigError::InvalidScanner(format!(
                "max_budget must not be negative, got {}",
                self.scanner.max_budget
            )));
        }
        if self.scanner.max_concurrent_scans == 0 {
            return Err(ConfigError::InvalidScanner(
                "max_concurrent_scans must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for venue in self.enabled_venues() {
            let invalid = |reason: &str| ConfigError::InvalidVenue {
                venue: venue.name.clone(),
                reason: reason.to_string(),
            };

            if venue.name.trim().is_empty() {
                return Err(invalid("name is empty"));
            }
            if !seen.insert(venue.name.as_str()) {
                return Err(ConfigError::DuplicateVenue(venue.name.clone()));
            }
            if venue.base_url.is_empty() {
                return Err(invalid("base_url is empty"));
            }
            if !venue.ticker_format.contains("{base}") || !venue.ticker_format.contains("{quote}")
            {
                return Err(invalid("ticker_format needs {base} and {quote}"));
            }
            if venue.requests_per_minute == 0 {
                return Err(invalid("requests_per_minute must be at least 1"));
            }
        }

        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
