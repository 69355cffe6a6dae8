//! Pairwise opportunity detection for a single asset pair.
//!
//! The detector first runs a cheap top-of-book test over every ordered pair
//! of venues quoting the asset pair. Only the first venue pair that passes is
//! explored further: both full order books are fetched and crossed with the
//! [`OrderBookMatcher`] to size the opportunity.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};
use venue_arb_core::{AssetPair, Broker, QuoteSnapshot, VenueName};

use crate::error::ScanError;
use crate::matcher::{MatcherConfig, OrderBookMatcher};
use crate::types::Opportunity;

/// Brokers indexed by the venue name quotes are filed under.
pub type BrokerMap = BTreeMap<VenueName, Arc<dyn Broker>>;

// =============================================================================
// Pair Outcome
// =============================================================================

/// What scanning one asset pair produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// No venue's best bid clears another venue's best ask.
    NoSpread,
    /// Top of book crossed, but the books had no executable volume.
    InsufficientDepth {
        buy_venue: VenueName,
        sell_venue: VenueName,
    },
    /// A sized opportunity.
    Found(Opportunity),
}

impl PairOutcome {
    /// Returns true if the top-of-book test passed for some venue pair.
    #[must_use]
    pub fn is_coarse_hit(&self) -> bool {
        !matches!(self, Self::NoSpread)
    }

    #[must_use]
    pub fn into_opportunity(self) -> Option<Opportunity> {
        match self {
            Self::Found(opportunity) => Some(opportunity),
            _ => None,
        }
    }
}

// =============================================================================
// Detector
// =============================================================================

/// Finds and sizes cross-venue opportunities for one asset pair at a time.
///
/// Cheap to clone; clones share the broker map.
#[derive(Clone)]
pub struct OpportunityDetector {
    brokers: Arc<BrokerMap>,
    matcher: OrderBookMatcher,
}

impl std::fmt::Debug for OpportunityDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpportunityDetector")
            .field("venues", &self.brokers.keys().collect::<Vec<_>>())
            .field("matcher", &self.matcher)
            .finish()
    }
}

impl OpportunityDetector {
    #[must_use]
    pub fn new(brokers: Arc<BrokerMap>, config: MatcherConfig) -> Self {
        Self {
            brokers,
            matcher: OrderBookMatcher::with_config(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        self.matcher.config()
    }

    #[must_use]
    pub fn brokers(&self) -> &Arc<BrokerMap> {
        &self.brokers
    }

    /// Looks up the broker registered for a venue.
    pub fn broker(&self, venue: &str) -> Result<&Arc<dyn Broker>, ScanError> {
        self.brokers
            .get(venue)
            .ok_or_else(|| ScanError::unknown_venue(venue))
    }

    /// Returns the first `(sell, buy)` quote pair whose top of book crosses.
    ///
    /// Venues are visited in name order, the selling venue in the outer loop.
    /// A venue is never paired with itself.
    #[must_use]
    pub fn find_crossing<'a>(
        &self,
        quotes: &'a BTreeMap<VenueName, QuoteSnapshot>,
    ) -> Option<(&'a QuoteSnapshot, &'a QuoteSnapshot)> {
        let config = self.matcher.config();
        quotes.iter().find_map(|(sell_name, sell)| {
            quotes
                .iter()
                .filter(|(buy_name, _)| *buy_name != sell_name)
                .find(|(_, buy)| config.clears(sell.highest_bid, buy.lowest_ask))
                .map(|(_, buy)| (sell, buy))
        })
    }

    /// Scans one asset pair and reports how far it got.
    ///
    /// # Errors
    ///
    /// Returns an error if a crossing venue has no registered broker or if
    /// either order book cannot be fetched.
    pub async fn evaluate_pair(
        &self,
        pair: &AssetPair,
        quotes: &BTreeMap<VenueName, QuoteSnapshot>,
    ) -> Result<PairOutcome, ScanError> {
        let Some((sell, buy)) = self.find_crossing(quotes) else {
            trace!(pair = %pair, venues = quotes.len(), "No top-of-book crossing");
            return Ok(PairOutcome::NoSpread);
        };

        debug!(
            pair = %pair,
            buy_venue = %buy.venue,
            sell_venue = %sell.venue,
            best_ask = %buy.lowest_ask,
            best_bid = %sell.highest_bid,
            "Top of book crosses, fetching depth"
        );

        let buy_broker = self.broker(&buy.venue)?;
        let sell_broker = self.broker(&sell.venue)?;

        let (buy_book, sell_book) = tokio::try_join!(
            async {
                buy_broker
                    .get_order_book(&buy.ticker)
                    .await
                    .map_err(|e| ScanError::venue(buy.venue.as_str(), pair, "order book", e))
            },
            async {
                sell_broker
                    .get_order_book(&sell.ticker)
                    .await
                    .map_err(|e| ScanError::venue(sell.venue.as_str(), pair, "order book", e))
            },
        )?;

        let plan = self.matcher.match_books(&buy_book, &sell_book);
        if plan.is_empty() {
            debug!(
                pair = %pair,
                buy_venue = %buy.venue,
                sell_venue = %sell.venue,
                "Books have no executable volume"
            );
            return Ok(PairOutcome::InsufficientDepth {
                buy_venue: buy.venue.clone(),
                sell_venue: sell.venue.clone(),
            });
        }

        Ok(PairOutcome::Found(Opportunity::new(buy, sell, plan)))
    }

    /// Scans one asset pair, returning the sized opportunity if there is one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::evaluate_pair`].
    pub async fn scan_pair(
        &self,
        pair: &AssetPair,
        quotes: &BTreeMap<VenueName, QuoteSnapshot>,
    ) -> Result<Option<Opportunity>, ScanError> {
        self.evaluate_pair(pair, quotes)
            .await
            .map(PairOutcome::into_opportunity)
    }
}
