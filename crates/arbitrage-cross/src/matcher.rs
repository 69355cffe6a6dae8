//! Order book crossing for cross-venue arbitrage.
//!
//! Given the asks of the venue we buy on and the bids of the venue we sell
//! on, this module computes how much can be bought and immediately resold
//! before the spread falls under the minimum profit ratio or the budget runs
//! out.
//!
//! ```text
//! asks (buy venue)        bids (sell venue)
//!   100 x 5   <- cursor     115 x 3   fill 3 @ 100, ask keeps 2
//!   101 x 5                 110 x 10  fill 2 @ 100, then 5 @ 101
//! ```
//!
//! The ask cursor is shared by all bids: a partly consumed ask keeps its
//! reduced quantity for the next bid. A bid's leftover quantity only lives
//! while that bid is processed. Remaining quantities are tracked in local
//! variables; the caller's books are never written to.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::trace;
use venue_arb_core::{Offer, OrderBook, ScannerSettings};

use crate::types::TradePlan;

// =============================================================================
// Matcher Configuration
// =============================================================================

/// Constraints applied while crossing two books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// A fill only happens while `bid > ask * min_profit_ratio`.
    pub min_profit_ratio: Decimal,

    /// Maximum quote currency spent on the buy side.
    pub max_budget: Decimal,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_profit_ratio: dec!(1.1), // 10% gross spread
            max_budget: dec!(1000),
        }
    }
}

impl MatcherConfig {
    /// Creates a configuration from explicit values.
    #[must_use]
    pub fn new(min_profit_ratio: Decimal, max_budget: Decimal) -> Self {
        Self {
            min_profit_ratio,
            max_budget,
        }
    }

    /// Creates a configuration from the loaded scanner settings.
    #[must_use]
    pub fn from_settings(settings: &ScannerSettings) -> Self {
        Self::new(settings.min_profit_ratio, settings.max_budget)
    }

    /// Sets the minimum profit ratio.
    #[must_use]
    pub fn with_min_profit_ratio(mut self, ratio: Decimal) -> Self {
        self.min_profit_ratio = ratio;
        self
    }

    /// Sets the budget.
    #[must_use]
    pub fn with_max_budget(mut self, budget: Decimal) -> Self {
        self.max_budget = budget;
        self
    }

    /// Returns true if a bid at `bid_price` still clears the ask at `ask_price`.
    #[must_use]
    pub fn clears(&self, bid_price: Decimal, ask_price: Decimal) -> bool {
        bid_price > ask_price * self.min_profit_ratio
    }
}

// =============================================================================
// Order Book Matcher
// =============================================================================

/// Crosses one venue's asks with another venue's bids.
#[derive(Debug, Clone, Default)]
pub struct OrderBookMatcher {
    config: MatcherConfig,
}

impl OrderBookMatcher {
    /// Creates a matcher with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a matcher with custom configuration.
    #[must_use]
    pub fn with_config(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Crosses `buy_book.asks` with `sell_book.bids`.
    #[must_use]
    pub fn match_books(&self, buy_book: &OrderBook, sell_book: &OrderBook) -> TradePlan {
        match_offers(
            &buy_book.asks,
            &sell_book.bids,
            self.config.min_profit_ratio,
            self.config.max_budget,
        )
    }
}

/// Greedy two-cursor crossing of `asks` (ascending) against `bids` (descending).
///
/// Stops at the first bid/ask combination that no longer clears
/// `min_profit_ratio`, when the budget is spent, or when either side runs
/// out. Unsorted input is a caller bug: it is caught by `debug_assert!` and
/// otherwise yields a smaller plan than the books allow.
#[must_use]
pub fn match_offers(
    asks: &[Offer],
    bids: &[Offer],
    min_profit_ratio: Decimal,
    max_budget: Decimal,
) -> TradePlan {
    debug_assert!(
        asks.windows(2).all(|w| w[0].price <= w[1].price),
        "asks must be sorted ascending by price"
    );
    debug_assert!(
        bids.windows(2).all(|w| w[0].price >= w[1].price),
        "bids must be sorted descending by price"
    );

    let mut plan = TradePlan::EMPTY;
    if max_budget <= Decimal::ZERO {
        return plan;
    }

    let mut ask_index = 0;
    let mut ask_remaining = asks.first().map_or(Decimal::ZERO, |a| a.quantity);

    'bids: for bid in bids {
        let mut bid_remaining = bid.quantity;

        while let Some(ask) = asks.get(ask_index) {
            if bid.price <= ask.price * min_profit_ratio {
                trace!(bid = %bid.price, ask = %ask.price, "spread exhausted");
                break 'bids;
            }

            let remaining_budget = max_budget - plan.usd_for_buying;
            if remaining_budget <= Decimal::ZERO {
                break 'bids;
            }

            if bid_remaining < ask_remaining {
                // Bid is the smaller side: take all of it from this ask.
                if ask.price * bid_remaining > remaining_budget {
                    let quantity = affordable_quantity(remaining_budget, ask.price);
                    plan.add_fill(quantity, ask.price, bid.price);
                    break 'bids;
                }

                plan.add_fill(bid_remaining, ask.price, bid.price);
                ask_remaining -= bid_remaining;
                continue 'bids;
            }

            // Ask is the smaller side: take all of it, then move to the next ask.
            if ask.price * ask_remaining > remaining_budget {
                let quantity = affordable_quantity(remaining_budget, ask.price);
                plan.add_fill(quantity, ask.price, bid.price);
                break 'bids;
            }

            plan.add_fill(ask_remaining, ask.price, bid.price);
            bid_remaining -= ask_remaining;
            ask_index += 1;
            ask_remaining = asks.get(ask_index).map_or(Decimal::ZERO, |a| a.quantity);

            if bid_remaining.is_zero() {
                continue 'bids;
            }
        }

        // Asks exhausted.
        break;
    }

    plan
}

/// Largest quantity whose cost at `price` does not exceed `budget`.
///
/// Decimal division rounds at 28 significant digits, so the quotient is
/// nudged down by one unit in the last place if it would overspend.
fn affordable_quantity(budget: Decimal, price: Decimal) -> Decimal {
    let quantity = budget / price;
    if quantity * price > budget {
        quantity - Decimal::new(1, quantity.scale())
    } else {
        quantity
    }
}
