//! [`Broker`] implementation over [`SpotRestClient`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};
use venue_arb_core::{
    AssetPair, Broker, BrokerError, CoinId, OrderBook, QuoteSnapshot, TickerStatus, VenueCatalog,
    VenueConfig, VenueTicker,
};

use crate::client::{SpotClientConfig, SpotRestClient};
use crate::error::SpotError;

/// One configured spot venue.
///
/// Symbol statuses are loaded by [`Broker::refresh_venue_state`] and read by
/// the transfer gates. Until the first refresh every gate answers `false`.
#[derive(Debug)]
pub struct SpotVenue {
    name: String,
    client: SpotRestClient,
    catalog: VenueCatalog,
    depth_limit: u32,
    statuses: RwLock<HashMap<String, TickerStatus>>,
    /// Coins configured as not withdrawable. Stands in for a live per-network
    /// wallet check, which needs authenticated endpoints.
    withdraw_disabled: BTreeSet<CoinId>,
    /// Coins configured as not depositable. Same stand-in as `withdraw_disabled`.
    deposit_disabled: BTreeSet<CoinId>,
}

impl SpotVenue {
    /// Builds a venue from its configuration and the tracked pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is invalid.
    pub fn from_config(config: &VenueConfig, pairs: &[AssetPair]) -> Result<Self, SpotError> {
        let client = SpotRestClient::new(SpotClientConfig::from_venue(config)?)?;
        Ok(Self::with_client(config, VenueCatalog::new(config, pairs), client))
    }

    /// Builds a venue around an existing client.
    #[must_use]
    pub fn with_client(config: &VenueConfig, catalog: VenueCatalog, client: SpotRestClient) -> Self {
        Self {
            name: config.name.clone(),
            client,
            catalog,
            depth_limit: config.depth_limit,
            statuses: RwLock::new(HashMap::new()),
            withdraw_disabled: config.withdraw_disabled.iter().cloned().collect(),
            deposit_disabled: config.deposit_disabled.iter().cloned().collect(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &VenueCatalog {
        &self.catalog
    }

    /// Status of a symbol as of the last refresh.
    #[must_use]
    pub fn ticker_status(&self, symbol: &str) -> Option<TickerStatus> {
        self.statuses.read().get(&symbol.to_uppercase()).copied()
    }
}

#[async_trait]
impl Broker for SpotVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote_snapshots(
        &self,
        pairs: &[AssetPair],
    ) -> venue_arb_core::Result<BTreeMap<AssetPair, QuoteSnapshot>> {
        let wanted: BTreeSet<&AssetPair> = pairs.iter().collect();
        let tickers = self.client.get_book_tickers().await?;

        let mut quotes = BTreeMap::new();
        for raw in &tickers {
            let Some(ticker) = self.catalog.ticker_for_symbol(&raw.symbol) else {
                continue;
            };
            if !wanted.contains(&ticker.pair) {
                continue;
            }
            let Some((bid, ask)) = raw.top_of_book() else {
                trace!(venue = %self.name, symbol = %raw.symbol, "Skipping one-sided quote");
                continue;
            };
            quotes.insert(
                ticker.pair.clone(),
                QuoteSnapshot::new(self.name.as_str(), ticker, bid, ask),
            );
        }

        debug!(
            venue = %self.name,
            listed = tickers.len(),
            tracked = quotes.len(),
            "Book tickers fetched"
        );
        Ok(quotes)
    }

    async fn get_order_book(&self, ticker: &VenueTicker) -> venue_arb_core::Result<OrderBook> {
        let depth = self
            .client
            .get_depth(&ticker.symbol, self.depth_limit)
            .await?;
        Ok(OrderBook::from(depth))
    }

    async fn can_buy_and_withdraw(&self, ticker: &VenueTicker) -> venue_arb_core::Result<bool> {
        if self.withdraw_disabled.contains(&ticker.pair.base) {
            return Ok(false);
        }
        Ok(self
            .ticker_status(&ticker.symbol)
            .is_some_and(|status| status.can_be_bought()))
    }

    async fn can_deposit_and_sell(&self, ticker: &VenueTicker) -> venue_arb_core::Result<bool> {
        if self.deposit_disabled.contains(&ticker.pair.base) {
            return Ok(false);
        }
        Ok(self
            .ticker_status(&ticker.symbol)
            .is_some_and(|status| status.can_be_sold()))
    }

    async fn refresh_venue_state(&self) -> venue_arb_core::Result<()> {
        let info = self.client.get_exchange_info().await?;
        if info.symbols.is_empty() {
            return Err(BrokerError::DataUnavailable(format!(
                "{} returned no symbols",
                self.name
            )));
        }

        let statuses: HashMap<String, TickerStatus> = info
            .symbols
            .iter()
            .map(|s| (s.symbol.to_uppercase(), s.ticker_status()))
            .collect();

        let missing: Vec<&str> = self
            .catalog
            .iter()
            .filter(|(_, symbol)| !statuses.contains_key(&symbol.to_uppercase()))
            .map(|(_, symbol)| symbol)
            .collect();
        if !missing.is_empty() {
            warn!(venue = %self.name, missing = ?missing, "Tracked symbols not listed by venue");
        }

        info!(
            venue = %self.name,
            symbols = statuses.len(),
            tradable = statuses.values().filter(|s| s.can_trade()).count(),
            "Venue state refreshed"
        );
        *self.statuses.write() = statuses;
        Ok(())
    }
}
