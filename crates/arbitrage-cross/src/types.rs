//! Shared types for cross-venue opportunity detection.
//!
//! This module defines the matcher output ([`TradePlan`]), the scanner output
//! ([`Opportunity`]), and the immutable per-cycle index of quotes
//! ([`MarketSnapshot`]) that every scan task reads from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use venue_arb_core::{AssetPair, QuoteSnapshot, VenueName, VenueTicker};

// =============================================================================
// Trade Plan
// =============================================================================

/// Executable volume found by crossing one venue's asks with another's bids.
///
/// `usd_for_buying` is the sum of ask price times matched quantity and
/// `usd_for_selling` the sum of bid price times matched quantity. The
/// all-zero value means "no opportunity".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePlan {
    /// Base quantity to buy on the ask side (and sell on the bid side).
    pub quantity_to_buy: Decimal,
    /// Quote currency spent buying.
    pub usd_for_buying: Decimal,
    /// Quote currency received selling.
    pub usd_for_selling: Decimal,
}

impl TradePlan {
    /// The canonical "no opportunity" plan.
    pub const EMPTY: Self = Self {
        quantity_to_buy: Decimal::ZERO,
        usd_for_buying: Decimal::ZERO,
        usd_for_selling: Decimal::ZERO,
    };

    /// Returns true if nothing was matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantity_to_buy.is_zero()
    }

    /// Records a fill of `quantity` bought at `ask_price` and sold at `bid_price`.
    pub fn add_fill(&mut self, quantity: Decimal, ask_price: Decimal, bid_price: Decimal) {
        self.quantity_to_buy += quantity;
        self.usd_for_buying += quantity * ask_price;
        self.usd_for_selling += quantity * bid_price;
    }

    /// Proceeds minus cost, before fees and transfer costs.
    #[must_use]
    pub fn gross_profit(&self) -> Decimal {
        self.usd_for_selling - self.usd_for_buying
    }

    /// Proceeds divided by cost. Zero when nothing is bought.
    #[must_use]
    pub fn profit_ratio(&self) -> Decimal {
        if self.usd_for_buying.is_zero() {
            return Decimal::ZERO;
        }
        self.usd_for_selling / self.usd_for_buying
    }

    /// Average price paid per unit bought.
    #[must_use]
    pub fn average_buy_price(&self) -> Option<Decimal> {
        (!self.quantity_to_buy.is_zero()).then(|| self.usd_for_buying / self.quantity_to_buy)
    }

    /// Average price received per unit sold.
    #[must_use]
    pub fn average_sell_price(&self) -> Option<Decimal> {
        (!self.quantity_to_buy.is_zero()).then(|| self.usd_for_selling / self.quantity_to_buy)
    }
}

// =============================================================================
// Opportunity
// =============================================================================

/// A point-in-time cross-venue opportunity: buy on one venue, sell on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub pair: AssetPair,
    /// Venue whose asks are taken.
    pub buy_venue: VenueName,
    /// Venue whose bids are hit.
    pub sell_venue: VenueName,
    pub buy_ticker: VenueTicker,
    pub sell_ticker: VenueTicker,
    pub plan: TradePlan,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Builds an opportunity from the quote on each side.
    #[must_use]
    pub fn new(buy: &QuoteSnapshot, sell: &QuoteSnapshot, plan: TradePlan) -> Self {
        Self {
            pair: buy.pair.clone(),
            buy_venue: buy.venue.clone(),
            sell_venue: sell.venue.clone(),
            buy_ticker: buy.ticker.clone(),
            sell_ticker: sell.ticker.clone(),
            plan,
            detected_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn gross_profit(&self) -> Decimal {
        self.plan.gross_profit()
    }
}

impl std::fmt::Display for Opportunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buy on {} sell on {}: qty {} cost {} proceeds {}",
            self.pair,
            self.buy_venue,
            self.sell_venue,
            self.plan.quantity_to_buy,
            self.plan.usd_for_buying,
            self.plan.usd_for_selling
        )
    }
}

// =============================================================================
// Market Snapshot
// =============================================================================

/// Quotes for one cycle, indexed by asset pair and then by venue name.
///
/// Built once per polling cycle and never mutated while scans run. Both
/// levels are `BTreeMap`s so iteration order (and therefore which venue pair
/// is explored first) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketSnapshot {
    pairs: BTreeMap<AssetPair, BTreeMap<VenueName, QuoteSnapshot>>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-indexes per-venue quote maps into per-pair venue maps.
    #[must_use]
    pub fn from_venue_quotes<I>(per_venue: I) -> Self
    where
        I: IntoIterator<Item = (VenueName, BTreeMap<AssetPair, QuoteSnapshot>)>,
    {
        let mut snapshot = Self::new();
        for (venue, quotes) in per_venue {
            for (pair, mut quote) in quotes {
                quote.venue.clone_from(&venue);
                snapshot.pairs.entry(pair).or_default().insert(venue.clone(), quote);
            }
        }
        snapshot
    }

    /// Adds a single quote, replacing any previous quote for the same venue and pair.
    pub fn insert(&mut self, quote: QuoteSnapshot) {
        self.pairs
            .entry(quote.pair.clone())
            .or_default()
            .insert(quote.venue.clone(), quote);
    }

    #[must_use]
    pub fn quotes(&self, pair: &AssetPair) -> Option<&BTreeMap<VenueName, QuoteSnapshot>> {
        self.pairs.get(pair)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetPair, &BTreeMap<VenueName, QuoteSnapshot>)> {
        self.pairs.iter()
    }

    /// Number of asset pairs with at least one quote.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(venue: &str, base: &str, bid: Decimal, ask: Decimal) -> QuoteSnapshot {
        let pair = AssetPair::new(base, "USDT");
        let ticker = VenueTicker::new(format!("{base}USDT"), pair);
        QuoteSnapshot::new(venue, ticker, bid, ask)
    }

    #[test]
    fn test_trade_plan_empty() {
        assert!(TradePlan::EMPTY.is_empty());
        assert_eq!(TradePlan::default(), TradePlan::EMPTY);
        assert_eq!(TradePlan::EMPTY.profit_ratio(), Decimal::ZERO);
        assert_eq!(TradePlan::EMPTY.average_buy_price(), None);
    }

    #[test]
    fn test_trade_plan_add_fill() {
        let mut plan = TradePlan::EMPTY;
        plan.add_fill(dec!(3), dec!(100), dec!(115));
        plan.add_fill(dec!(2), dec!(100), dec!(110));

        assert_eq!(plan.quantity_to_buy, dec!(5));
        assert_eq!(plan.usd_for_buying, dec!(500));
        assert_eq!(plan.usd_for_selling, dec!(565));
        assert_eq!(plan.gross_profit(), dec!(65));
        assert_eq!(plan.profit_ratio(), dec!(1.13));
        assert_eq!(plan.average_buy_price(), Some(dec!(100)));
        assert_eq!(plan.average_sell_price(), Some(dec!(113)));
    }

    #[test]
    fn test_snapshot_reindexes_by_pair() {
        let binance: BTreeMap<_, _> = [
            (AssetPair::new("BTC", "USDT"), quote("Binance", "BTC", dec!(100), dec!(101))),
            (AssetPair::new("ETH", "USDT"), quote("Binance", "ETH", dec!(10), dec!(11))),
        ]
        .into_iter()
        .collect();
        let mexc: BTreeMap<_, _> = [(
            AssetPair::new("BTC", "USDT"),
            quote("MEXC", "BTC", dec!(102), dec!(103)),
        )]
        .into_iter()
        .collect();

        let snapshot = MarketSnapshot::from_venue_quotes(vec![
            ("MEXC".to_string(), mexc),
            ("Binance".to_string(), binance),
        ]);

        assert_eq!(snapshot.len(), 2);
        let btc = snapshot.quotes(&AssetPair::new("BTC", "USDT")).unwrap();
        let venues: Vec<_> = btc.keys().cloned().collect();
        assert_eq!(venues, vec!["Binance".to_string(), "MEXC".to_string()]);
        assert_eq!(
            snapshot.quotes(&AssetPair::new("ETH", "USDT")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_snapshot_venue_name_follows_index() {
        let quotes: BTreeMap<_, _> = [(
            AssetPair::new("BTC", "USDT"),
            quote("whatever", "BTC", dec!(1), dec!(2)),
        )]
        .into_iter()
        .collect();

        let snapshot = MarketSnapshot::from_venue_quotes(vec![("Gate".to_string(), quotes)]);
        let btc = snapshot.quotes(&AssetPair::new("BTC", "USDT")).unwrap();
        assert_eq!(btc["Gate"].venue, "Gate");
    }

    #[test]
    fn test_opportunity_display() {
        let buy = quote("Binance", "BTC", dec!(99), dec!(100));
        let sell = quote("MEXC", "BTC", dec!(115), dec!(116));
        let mut plan = TradePlan::EMPTY;
        plan.add_fill(dec!(1), dec!(100), dec!(115));

        let opp = Opportunity::new(&buy, &sell, plan);
        assert_eq!(opp.buy_venue, "Binance");
        assert_eq!(opp.sell_venue, "MEXC");
        assert_eq!(opp.gross_profit(), dec!(15));
        assert!(opp.to_string().contains("buy on Binance sell on MEXC"));
    }
}
