//! Wire types for the public spot REST endpoints.
//!
//! Prices and quantities arrive as JSON strings; `rust_decimal` parses them
//! without going through floating point.

use rust_decimal::Decimal;
use serde::Deserialize;
use venue_arb_core::{OrderBook, TickerStatus};

/// Statuses meaning "open for trading" across Binance-style APIs.
const TRADING_STATUSES: [&str; 3] = ["TRADING", "ENABLED", "1"];

/// One entry of `GET /api/v3/ticker/bookTicker`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    #[serde(default)]
    pub bid_price: Option<Decimal>,
    #[serde(default)]
    pub bid_qty: Option<Decimal>,
    #[serde(default)]
    pub ask_price: Option<Decimal>,
    #[serde(default)]
    pub ask_qty: Option<Decimal>,
}

impl BookTicker {
    /// Best bid and ask, when both are present and positive.
    #[must_use]
    pub fn top_of_book(&self) -> Option<(Decimal, Decimal)> {
        match (self.bid_price, self.ask_price) {
            (Some(bid), Some(ask)) if bid > Decimal::ZERO && ask > Decimal::ZERO => {
                Some((bid, ask))
            }
            _ => None,
        }
    }
}

/// Response of `GET /api/v3/depth`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthSnapshot {
    #[serde(default)]
    pub last_update_id: Option<u64>,
    /// `[price, quantity]` levels.
    #[serde(default)]
    pub bids: Vec<(Decimal, Decimal)>,
    #[serde(default)]
    pub asks: Vec<(Decimal, Decimal)>,
}

impl From<DepthSnapshot> for OrderBook {
    fn from(depth: DepthSnapshot) -> Self {
        OrderBook::from_levels(depth.bids, depth.asks)
    }
}

/// Response of `GET /api/v3/exchangeInfo`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeInfo {
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub base_asset: String,
    #[serde(default)]
    pub quote_asset: String,
    #[serde(default)]
    pub order_types: Vec<String>,
    #[serde(default)]
    pub is_spot_trading_allowed: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Per-side trade status (`tradable`, `buyable`, `sellable`,
    /// `untradable`). Only some venues report it.
    #[serde(default, alias = "trade_status")]
    pub trade_status: Option<String>,
}

impl SymbolInfo {
    /// Maps the venue's symbol metadata onto a [`TickerStatus`].
    ///
    /// An empty `permissions` list is accepted: some venues have moved spot
    /// permissions elsewhere and only report `isSpotTradingAllowed`. When the
    /// venue reports a trade status, it decides which sides are open;
    /// otherwise both sides follow `status`.
    #[must_use]
    pub fn ticker_status(&self) -> TickerStatus {
        let enabled = TRADING_STATUSES
            .iter()
            .any(|s| self.status.eq_ignore_ascii_case(s));
        let limit_orders_allowed = self
            .order_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case("LIMIT"));
        let spot_permission = self.permissions.is_empty()
            || self
                .permissions
                .iter()
                .any(|p| p.eq_ignore_ascii_case("SPOT"));

        let (buyable, sellable) = match self.trade_status.as_deref() {
            Some(side) => {
                let side = side.to_ascii_uppercase();
                (
                    side == "TRADABLE" || side == "BUYABLE",
                    side == "TRADABLE" || side == "SELLABLE",
                )
            }
            None => (enabled, enabled),
        };

        TickerStatus {
            enabled,
            limit_orders_allowed,
            spot_allowed: self.is_spot_trading_allowed && spot_permission,
            buyable,
            sellable,
        }
    }
}
