use crate::error::Result;
use crate::types::{AssetPair, OrderBook, QuoteSnapshot, VenueTicker};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Market-data and capability access for a single venue.
///
/// Implementations must be cheap to share across scan tasks; the scanner holds
/// them as `Arc<dyn Broker>` and calls them concurrently.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Name the venue is registered under.
    fn name(&self) -> &str;

    /// Best bid/ask for every requested pair the venue lists.
    ///
    /// Pairs the venue does not list, or quotes with a zero side, are omitted
    /// rather than reported as errors.
    async fn get_quote_snapshots(
        &self,
        pairs: &[AssetPair],
    ) -> Result<BTreeMap<AssetPair, QuoteSnapshot>>;

    /// Full depth for a ticker. Sides are returned best-first.
    async fn get_order_book(&self, ticker: &VenueTicker) -> Result<OrderBook>;

    async fn can_buy_and_withdraw(&self, ticker: &VenueTicker) -> Result<bool>;

    async fn can_deposit_and_sell(&self, ticker: &VenueTicker) -> Result<bool>;

    /// Loads venue-wide trading status. Called once before the first cycle.
    async fn refresh_venue_state(&self) -> Result<()>;
}
