//! Destinations for opportunities that survived the transfer gates.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::Opportunity;

/// Receives every reported opportunity, in scan report order.
pub trait OpportunitySink: Send + Sync {
    fn report(&self, opportunity: &Opportunity);
}

/// Logs each opportunity at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl OpportunitySink for LogSink {
    fn report(&self, opportunity: &Opportunity) {
        info!(
            pair = %opportunity.pair,
            buy_venue = %opportunity.buy_venue,
            sell_venue = %opportunity.sell_venue,
            buy_ticker = %opportunity.buy_ticker,
            sell_ticker = %opportunity.sell_ticker,
            quantity = %opportunity.plan.quantity_to_buy,
            cost = %opportunity.plan.usd_for_buying,
            proceeds = %opportunity.plan.usd_for_selling,
            gross_profit = %opportunity.gross_profit(),
            "Arbitrage opportunity"
        );
    }
}

/// Forwards opportunities to a bounded channel.
///
/// A full or closed channel drops the opportunity with a warning; the
/// scanner never waits on a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Opportunity>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::Sender<Opportunity>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the receiver for it.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Opportunity>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl OpportunitySink for ChannelSink {
    fn report(&self, opportunity: &Opportunity) {
        if let Err(err) = self.tx.try_send(opportunity.clone()) {
            warn!(
                pair = %opportunity.pair,
                error = %err,
                "Dropping opportunity, channel unavailable"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradePlan;
    use rust_decimal_macros::dec;
    use venue_arb_core::{AssetPair, QuoteSnapshot, VenueTicker};

    fn opportunity() -> Opportunity {
        let pair = AssetPair::new("ETH", "USDT");
        let buy = QuoteSnapshot::new("alpha", VenueTicker::new("ETHUSDT", pair.clone()), dec!(9), dec!(10));
        let sell = QuoteSnapshot::new("beta", VenueTicker::new("ETH_USDT", pair), dec!(12), dec!(13));
        let mut plan = TradePlan::EMPTY;
        plan.add_fill(dec!(1), dec!(10), dec!(12));
        Opportunity::new(&buy, &sell, plan)
    }

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::channel(4);
        let opp = opportunity();
        sink.report(&opp);

        assert_eq!(rx.recv().await, Some(opp));
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, mut rx) = ChannelSink::channel(1);
        sink.report(&opportunity());
        sink.report(&opportunity());

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_closed_receiver_does_not_panic() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        sink.report(&opportunity());
    }

    #[test]
    fn test_log_sink_reports() {
        LogSink.report(&opportunity());
    }
}
