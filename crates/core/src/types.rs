//! Market data types shared by venues and the opportunity scanner.
//!
//! Prices and quantities are `rust_decimal::Decimal` everywhere. Nothing in
//! this module touches binary floating point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name a venue is registered under (e.g. "Binance", "MEXC").
pub type VenueName = String;

// =============================================================================
// Coins and Asset Pairs
// =============================================================================

/// Venue-independent coin identifier, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CoinId(String);

impl CoinId {
    /// Creates a coin identifier, trimming and upper-casing the symbol.
    #[must_use]
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    /// Returns the normalised symbol.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CoinId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for CoinId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<CoinId> for String {
    fn from(id: CoinId) -> Self {
        id.0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered (base, quote) pair. The base is priced in the quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetPair {
    pub base: CoinId,
    pub quote: CoinId,
}

impl AssetPair {
    #[must_use]
    pub fn new(base: impl Into<CoinId>, quote: impl Into<CoinId>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

// =============================================================================
// Order Book
// =============================================================================

/// A single resting order level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Offer {
    #[must_use]
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }

    /// Cost of taking the whole level.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// Full depth for one ticker on one venue.
///
/// Bids are sorted by descending price and asks by ascending price, so index 0
/// is always the best level on each side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<Offer>,
    pub asks: Vec<Offer>,
}

impl OrderBook {
    /// Builds a book from raw `(price, quantity)` levels.
    ///
    /// Levels with a non-positive quantity are dropped and both sides are
    /// sorted best-first.
    #[must_use]
    pub fn from_levels(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> Self {
        let keep = |(price, quantity): (Decimal, Decimal)| {
            (quantity > Decimal::ZERO).then(|| Offer::new(price, quantity))
        };

        let mut book = Self {
            bids: bids.into_iter().filter_map(keep).collect(),
            asks: asks.into_iter().filter_map(keep).collect(),
        };
        book.sort();
        book
    }

    /// Sorts bids descending and asks ascending by price.
    pub fn sort(&mut self) {
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));
    }

    /// Returns true if bids are strictly descending and asks strictly ascending.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.bids.windows(2).all(|w| w[0].price > w[1].price)
            && self.asks.windows(2).all(|w| w[0].price < w[1].price)
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<&Offer> {
        self.bids.first()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<&Offer> {
        self.asks.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// Venue-specific handle for a ticker, used to request depth and check gates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenueTicker {
    /// Symbol as the venue spells it (e.g. "BTCUSDT", "BTC_USDT").
    pub symbol: String,
    pub pair: AssetPair,
}

impl VenueTicker {
    #[must_use]
    pub fn new(symbol: impl Into<String>, pair: AssetPair) -> Self {
        Self {
            symbol: symbol.into(),
            pair,
        }
    }
}

impl fmt::Display for VenueTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Best bid and ask for one asset pair on one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub venue: VenueName,
    pub pair: AssetPair,
    pub highest_bid: Decimal,
    pub lowest_ask: Decimal,
    pub ticker: VenueTicker,
}

impl QuoteSnapshot {
    #[must_use]
    pub fn new(
        venue: impl Into<VenueName>,
        ticker: VenueTicker,
        highest_bid: Decimal,
        lowest_ask: Decimal,
    ) -> Self {
        Self {
            venue: venue.into(),
            pair: ticker.pair.clone(),
            highest_bid,
            lowest_ask,
            ticker,
        }
    }

    /// Returns true when both sides carry a usable (positive) price.
    #[must_use]
    pub fn is_quoted(&self) -> bool {
        self.highest_bid > Decimal::ZERO && self.lowest_ask > Decimal::ZERO
    }
}

// =============================================================================
// Ticker Status
// =============================================================================

/// Trading status of a symbol as reported by the venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerStatus {
    pub enabled: bool,
    pub limit_orders_allowed: bool,
    pub spot_allowed: bool,
    pub buyable: bool,
    pub sellable: bool,
}

impl TickerStatus {
    #[must_use]
    pub fn can_trade(&self) -> bool {
        self.enabled && self.limit_orders_allowed && self.spot_allowed
    }

    #[must_use]
    pub fn can_be_bought(&self) -> bool {
        self.can_trade() && self.buyable
    }

    #[must_use]
    pub fn can_be_sold(&self) -> bool {
        self.can_trade() && self.sellable
    }
}
