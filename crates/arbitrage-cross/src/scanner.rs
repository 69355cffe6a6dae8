//! Concurrent scanning of every tracked asset pair.
//!
//! Each asset pair quoted by at least two venues is scanned in its own task.
//! Tasks share one read-only [`MarketSnapshot`] and are throttled by a
//! semaphore. Once every task has finished, the collected opportunities are
//! ordered, checked against the buy and sell venues' transfer gates, and
//! handed to the configured [`OpportunitySink`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use venue_arb_core::{AssetPair, ScannerSettings};

use crate::detector::{BrokerMap, OpportunityDetector, PairOutcome};
use crate::error::ScanError;
use crate::matcher::MatcherConfig;
use crate::sink::{LogSink, OpportunitySink};
use crate::types::{MarketSnapshot, Opportunity};

// =============================================================================
// Scanner Configuration
// =============================================================================

/// Configuration for a scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub matcher: MatcherConfig,
    /// Upper bound on per-pair scans running at once. Zero is treated as one.
    pub max_concurrent_scans: usize,
    /// Abort the pass on the first non-transient pair error.
    pub fail_fast: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            max_concurrent_scans: 16,
            fail_fast: false,
        }
    }
}

impl ScannerConfig {
    #[must_use]
    pub fn from_settings(settings: &ScannerSettings) -> Self {
        Self {
            matcher: MatcherConfig::from_settings(settings),
            max_concurrent_scans: settings.max_concurrent_scans,
            fail_fast: settings.fail_fast,
        }
    }

    #[must_use]
    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_scans(mut self, limit: usize) -> Self {
        self.max_concurrent_scans = limit;
        self
    }

    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

// =============================================================================
// Scan Report
// =============================================================================

/// Counters for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Asset pairs present in the snapshot.
    pub pairs_tracked: usize,
    /// Pairs that were handed to a scan task.
    pub pairs_scanned: usize,
    /// Pairs quoted by fewer than two venues.
    pub pairs_skipped: usize,
    /// Pairs whose scan returned an error or panicked.
    pub pairs_failed: usize,
    /// Pairs where some venue's best bid cleared another's best ask.
    pub coarse_hits: usize,
    /// Coarse hits whose books had no executable volume.
    pub insufficient_depth: usize,
    pub opportunities_found: usize,
    /// Opportunities dropped by a gate, including gate errors.
    pub filtered_by_gate: usize,
    pub gate_errors: usize,
    pub reported: usize,
}

impl ScanStats {
    /// Adds another pass's counters to this one.
    pub fn accumulate(&mut self, other: &Self) {
        self.pairs_tracked += other.pairs_tracked;
        self.pairs_scanned += other.pairs_scanned;
        self.pairs_skipped += other.pairs_skipped;
        self.pairs_failed += other.pairs_failed;
        self.coarse_hits += other.coarse_hits;
        self.insufficient_depth += other.insufficient_depth;
        self.opportunities_found += other.opportunities_found;
        self.filtered_by_gate += other.filtered_by_gate;
        self.gate_errors += other.gate_errors;
        self.reported += other.reported;
    }
}

/// Result of one scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Opportunities that passed both gates, ordered by pair then buy venue.
    pub opportunities: Vec<Opportunity>,
    pub stats: ScanStats,
    /// Shutdown was requested before the pass finished.
    pub cancelled: bool,
    /// The non-transient error that aborted the pass in fail-fast mode.
    pub aborted_by: Option<String>,
}

impl ScanReport {
    /// Returns true if every scan task ran to completion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.aborted_by.is_none()
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Fans a [`MarketSnapshot`] out into per-pair scans and gathers the results.
#[derive(Clone)]
pub struct OpportunityScanner {
    detector: OpportunityDetector,
    config: ScannerConfig,
    sink: Arc<dyn OpportunitySink>,
}

impl std::fmt::Debug for OpportunityScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpportunityScanner")
            .field("detector", &self.detector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpportunityScanner {
    /// Creates a scanner that reports through [`LogSink`].
    #[must_use]
    pub fn new(brokers: Arc<BrokerMap>, config: ScannerConfig) -> Self {
        Self {
            detector: OpportunityDetector::new(brokers, config.matcher),
            config,
            sink: Arc::new(LogSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OpportunitySink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    #[must_use]
    pub fn detector(&self) -> &OpportunityDetector {
        &self.detector
    }

    /// Scans every pair in the snapshot to completion.
    pub async fn scan_all(&self, snapshot: Arc<MarketSnapshot>) -> ScanReport {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.scan_all_until(snapshot, shutdown_rx).await
    }

    /// Scans every pair in the snapshot, stopping early if `shutdown` flips
    /// to `true`.
    ///
    /// A cancelled or aborted pass reports nothing: the partial counters are
    /// returned but the gate filter and sink are skipped.
    pub async fn scan_all_until(
        &self,
        snapshot: Arc<MarketSnapshot>,
        mut shutdown: watch::Receiver<bool>,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_scans.max(1)));
        let mut tasks = JoinSet::new();

        for (pair, quotes) in snapshot.iter() {
            report.stats.pairs_tracked += 1;
            if quotes.len() < 2 {
                report.stats.pairs_skipped += 1;
                continue;
            }
            report.stats.pairs_scanned += 1;

            let detector = self.detector.clone();
            let snapshot = Arc::clone(&snapshot);
            let semaphore = Arc::clone(&semaphore);
            let pair = pair.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (pair, Err(ScanError::Cancelled));
                };
                let result = match snapshot.quotes(&pair) {
                    Some(quotes) => detector.evaluate_pair(&pair, quotes).await,
                    None => Ok(PairOutcome::NoSpread),
                };
                (pair, result)
            });
        }

        let mut found = Vec::new();
        let mut shutdown_open = true;

        if *shutdown.borrow() {
            report.cancelled = true;
        }

        while !report.cancelled && report.aborted_by.is_none() {
            tokio::select! {
                biased;

                changed = shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        shutdown_open = false;
                    } else if *shutdown.borrow() {
                        report.cancelled = true;
                    }
                }

                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((pair, Ok(outcome))) => {
                            Self::record_outcome(&mut report.stats, outcome, &mut found);
                            debug!(pair = %pair, "Pair scan finished");
                        }
                        Ok((pair, Err(err))) => {
                            report.stats.pairs_failed += 1;
                            warn!(pair = %pair, error = %err, "Pair scan failed");
                            if self.config.fail_fast && !err.is_transient() {
                                report.aborted_by = Some(err.to_string());
                            }
                        }
                        Err(join_err) => {
                            report.stats.pairs_failed += 1;
                            warn!(error = %join_err, "Pair scan task did not complete");
                        }
                    }
                }
            }
        }

        if !report.is_complete() {
            tasks.shutdown().await;
            if report.cancelled {
                info!(
                    scanned = report.stats.pairs_scanned,
                    "Scan cancelled by shutdown"
                );
            } else {
                warn!(
                    error = report.aborted_by.as_deref().unwrap_or_default(),
                    "Scan aborted on unrecoverable error"
                );
            }
            return report;
        }

        found.sort_by(|a: &Opportunity, b: &Opportunity| {
            a.pair
                .cmp(&b.pair)
                .then_with(|| a.buy_venue.cmp(&b.buy_venue))
                .then_with(|| a.sell_venue.cmp(&b.sell_venue))
        });

        for opportunity in found {
            match self.passes_gates(&opportunity).await {
                Ok(true) => {
                    self.sink.report(&opportunity);
                    report.stats.reported += 1;
                    report.opportunities.push(opportunity);
                }
                Ok(false) => {
                    report.stats.filtered_by_gate += 1;
                    debug!(
                        pair = %opportunity.pair,
                        buy_venue = %opportunity.buy_venue,
                        sell_venue = %opportunity.sell_venue,
                        "Opportunity blocked by transfer gate"
                    );
                }
                Err(err) => {
                    report.stats.filtered_by_gate += 1;
                    report.stats.gate_errors += 1;
                    warn!(pair = %opportunity.pair, error = %err, "Gate check failed");
                }
            }
        }

        report
    }

    fn record_outcome(stats: &mut ScanStats, outcome: PairOutcome, found: &mut Vec<Opportunity>) {
        if outcome.is_coarse_hit() {
            stats.coarse_hits += 1;
        }
        match outcome {
            PairOutcome::NoSpread => {}
            PairOutcome::InsufficientDepth { .. } => stats.insufficient_depth += 1,
            PairOutcome::Found(opportunity) => {
                stats.opportunities_found += 1;
                found.push(opportunity);
            }
        }
    }

    /// Buy side must allow buying and withdrawing, sell side depositing and selling.
    async fn passes_gates(&self, opportunity: &Opportunity) -> Result<bool, ScanError> {
        let pair: &AssetPair = &opportunity.pair;

        let buyer = self.detector.broker(&opportunity.buy_venue)?;
        let can_buy = buyer
            .can_buy_and_withdraw(&opportunity.buy_ticker)
            .await
            .map_err(|e| ScanError::venue(opportunity.buy_venue.as_str(), pair, "buy gate", e))?;
        if !can_buy {
            return Ok(false);
        }

        let seller = self.detector.broker(&opportunity.sell_venue)?;
        seller
            .can_deposit_and_sell(&opportunity.sell_ticker)
            .await
            .map_err(|e| ScanError::venue(opportunity.sell_venue.as_str(), pair, "sell gate", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBroker;
    use crate::sink::ChannelSink;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use venue_arb_core::{Broker, BrokerError, OrderBook, QuoteSnapshot, VenueTicker};

    fn symbol(venue: &str, base: &str) -> String {
        format!("{venue}:{base}USDT")
    }

    fn quote(venue: &str, base: &str, bid: Decimal, ask: Decimal) -> QuoteSnapshot {
        let pair = AssetPair::new(base, "USDT");
        QuoteSnapshot::new(venue, VenueTicker::new(symbol(venue, base), pair), bid, ask)
    }

    /// `cheap` sells at 100, `rich` buys at 120: a crossing at ratio 1.1.
    fn list_crossing_market(cheap: &MockBroker, rich: &MockBroker, base: &str) {
        cheap.set_market(
            quote(cheap.name(), base, dec!(99), dec!(100)),
            OrderBook::from_levels(vec![(dec!(99), dec!(1))], vec![(dec!(100), dec!(2))]),
        );
        rich.set_market(
            quote(rich.name(), base, dec!(120), dec!(121)),
            OrderBook::from_levels(vec![(dec!(120), dec!(2))], vec![(dec!(121), dec!(1))]),
        );
    }

    fn brokers(list: &[Arc<MockBroker>]) -> Arc<BrokerMap> {
        Arc::new(
            list.iter()
                .map(|b| (b.name().to_string(), Arc::clone(b) as Arc<dyn Broker>))
                .collect(),
        )
    }

    async fn snapshot(list: &[Arc<MockBroker>], pairs: &[AssetPair]) -> Arc<MarketSnapshot> {
        let mut per_venue = Vec::new();
        for broker in list {
            let quotes = broker.get_quote_snapshots(pairs).await.unwrap();
            per_venue.push((broker.name().to_string(), quotes));
        }
        Arc::new(MarketSnapshot::from_venue_quotes(per_venue))
    }

    fn pairs(bases: &[&str]) -> Vec<AssetPair> {
        bases.iter().map(|b| AssetPair::new(*b, "USDT")).collect()
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_config_from_settings() {
        let settings = ScannerSettings {
            min_profit_ratio: dec!(1.02),
            max_budget: dec!(250),
            max_concurrent_scans: 4,
            fail_fast: true,
        };
        let config = ScannerConfig::from_settings(&settings);

        assert_eq!(config.matcher, MatcherConfig::new(dec!(1.02), dec!(250)));
        assert_eq!(config.max_concurrent_scans, 4);
        assert!(config.fail_fast);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = ScanStats::default();
        let pass = ScanStats {
            pairs_tracked: 3,
            reported: 1,
            ..ScanStats::default()
        };
        total.accumulate(&pass);
        total.accumulate(&pass);
        assert_eq!(total.pairs_tracked, 6);
        assert_eq!(total.reported, 2);
    }

    // ==================== Scan Tests ====================

    #[tokio::test]
    async fn test_scan_all_reports_opportunity() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        list_crossing_market(&cheap, &rich, "BTC");
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let (sink, mut rx) = ChannelSink::channel(8);
        let scanner = OpportunityScanner::new(brokers(&list), ScannerConfig::default())
            .with_sink(Arc::new(sink));
        let report = scanner.scan_all(snapshot(&list, &pairs(&["BTC"])).await).await;

        assert!(report.is_complete());
        assert_eq!(report.opportunities.len(), 1);
        let opp = &report.opportunities[0];
        assert_eq!(opp.buy_venue, "cheap");
        assert_eq!(opp.sell_venue, "rich");
        assert_eq!(opp.plan.quantity_to_buy, dec!(2));
        assert_eq!(opp.plan.usd_for_buying, dec!(200));
        assert_eq!(opp.plan.usd_for_selling, dec!(240));

        assert_eq!(report.stats.coarse_hits, 1);
        assert_eq!(report.stats.opportunities_found, 1);
        assert_eq!(report.stats.reported, 1);
        assert_eq!(rx.recv().await.unwrap().pair, AssetPair::new("BTC", "USDT"));
    }

    #[tokio::test]
    async fn test_pairs_with_single_venue_are_skipped() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        list_crossing_market(&cheap, &rich, "BTC");
        cheap.set_market(
            quote("cheap", "SOL", dec!(10), dec!(11)),
            OrderBook::default(),
        );
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let scanner = OpportunityScanner::new(brokers(&list), ScannerConfig::default());
        let report = scanner
            .scan_all(snapshot(&list, &pairs(&["BTC", "SOL"])).await)
            .await;

        assert_eq!(report.stats.pairs_tracked, 2);
        assert_eq!(report.stats.pairs_skipped, 1);
        assert_eq!(report.stats.pairs_scanned, 1);
        assert_eq!(report.opportunities.len(), 1);
    }

    #[tokio::test]
    async fn test_pair_error_is_isolated() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        for base in ["BTC", "ETH", "SOL"] {
            list_crossing_market(&cheap, &rich, base);
        }
        cheap.fail_order_book(symbol("cheap", "ETH"), BrokerError::Network("reset".into()));
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let scanner = OpportunityScanner::new(brokers(&list), ScannerConfig::default());
        let report = scanner
            .scan_all(snapshot(&list, &pairs(&["BTC", "ETH", "SOL"])).await)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.stats.pairs_failed, 1);
        let bases: Vec<_> = report
            .opportunities
            .iter()
            .map(|o| o.pair.base.to_string())
            .collect();
        assert_eq!(bases, vec!["BTC".to_string(), "SOL".to_string()]);
    }

    #[tokio::test]
    async fn test_gates_filter_opportunities() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        for base in ["BTC", "ETH", "SOL", "XRP"] {
            list_crossing_market(&cheap, &rich, base);
        }
        cheap.block_buying(symbol("cheap", "ETH"));
        rich.block_selling(symbol("rich", "SOL"));
        rich.fail_gates(symbol("rich", "XRP"));
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let scanner = OpportunityScanner::new(brokers(&list), ScannerConfig::default());
        let report = scanner
            .scan_all(snapshot(&list, &pairs(&["BTC", "ETH", "SOL", "XRP"])).await)
            .await;

        assert_eq!(report.stats.opportunities_found, 4);
        assert_eq!(report.stats.filtered_by_gate, 3);
        assert_eq!(report.stats.gate_errors, 1);
        assert_eq!(report.stats.reported, 1);
        assert_eq!(report.opportunities[0].pair, AssetPair::new("BTC", "USDT"));
    }

    #[tokio::test]
    async fn test_opportunities_are_ordered() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        let bases = ["ZEC", "ADA", "MKR", "BTC", "LTC"];
        for base in bases {
            list_crossing_market(&cheap, &rich, base);
        }
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let scanner = OpportunityScanner::new(
            brokers(&list),
            ScannerConfig::default().with_max_concurrent_scans(5),
        );
        let report = scanner.scan_all(snapshot(&list, &pairs(&bases)).await).await;

        let got: Vec<_> = report
            .opportunities
            .iter()
            .map(|o| o.pair.base.to_string())
            .collect();
        assert_eq!(got, vec!["ADA", "BTC", "LTC", "MKR", "ZEC"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let cheap = Arc::new(MockBroker::new("cheap").with_book_delay(Duration::from_millis(20)));
        let rich = Arc::new(MockBroker::new("rich").with_book_delay(Duration::from_millis(20)));
        let bases: Vec<String> = (0..12).map(|i| format!("T{i}")).collect();
        for base in &bases {
            list_crossing_market(&cheap, &rich, base);
        }
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];
        let tracked: Vec<_> = bases.iter().map(|b| AssetPair::new(b.as_str(), "USDT")).collect();

        let scanner = OpportunityScanner::new(
            brokers(&list),
            ScannerConfig::default().with_max_concurrent_scans(3),
        );
        let report = scanner.scan_all(snapshot(&list, &tracked).await).await;

        assert_eq!(report.stats.opportunities_found, 12);
        assert_eq!(cheap.book_calls(), 12);
        assert!(cheap.peak_in_flight() <= 3, "peak {}", cheap.peak_in_flight());
        assert!(rich.peak_in_flight() <= 3, "peak {}", rich.peak_in_flight());
        assert!(cheap.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_scans() {
        let cheap = Arc::new(MockBroker::new("cheap").with_book_delay(Duration::from_secs(30)));
        let rich = Arc::new(MockBroker::new("rich").with_book_delay(Duration::from_secs(30)));
        list_crossing_market(&cheap, &rich, "BTC");
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];
        let snap = snapshot(&list, &pairs(&["BTC"])).await;

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });

        let scanner = OpportunityScanner::new(brokers(&list), ScannerConfig::default());
        let report = tokio::time::timeout(Duration::from_secs(5), scanner.scan_all_until(snap, rx))
            .await
            .expect("scan should stop on shutdown");

        assert!(report.cancelled);
        assert!(report.opportunities.is_empty());
        assert_eq!(report.stats.reported, 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_returns_immediately() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        list_crossing_market(&cheap, &rich, "BTC");
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let (_tx, rx) = watch::channel(true);
        let scanner = OpportunityScanner::new(brokers(&list), ScannerConfig::default());
        let report = scanner
            .scan_all_until(snapshot(&list, &pairs(&["BTC"])).await, rx)
            .await;

        assert!(report.cancelled);
        assert!(report.opportunities.is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_on_fatal_error() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        list_crossing_market(&cheap, &rich, "BTC");
        cheap.fail_order_book(symbol("cheap", "BTC"), BrokerError::api(401, "bad key"));

        let slow_a = Arc::new(MockBroker::new("slow-a").with_book_delay(Duration::from_secs(30)));
        let slow_b = Arc::new(MockBroker::new("slow-b").with_book_delay(Duration::from_secs(30)));
        list_crossing_market(&slow_a, &slow_b, "ETH");

        let list = [cheap, rich, slow_a, slow_b];
        let scanner = OpportunityScanner::new(
            brokers(&list),
            ScannerConfig::default().with_fail_fast(true),
        );
        let snap = snapshot(&list, &pairs(&["BTC", "ETH"])).await;

        let report = tokio::time::timeout(Duration::from_secs(5), scanner.scan_all(snap))
            .await
            .expect("fail-fast should abort the slow scan");

        assert!(report.aborted_by.is_some());
        assert!(!report.is_complete());
        assert_eq!(report.stats.pairs_failed, 1);
        assert!(report.opportunities.is_empty());
    }

    #[tokio::test]
    async fn test_transient_error_does_not_fail_fast() {
        let cheap = Arc::new(MockBroker::new("cheap"));
        let rich = Arc::new(MockBroker::new("rich"));
        list_crossing_market(&cheap, &rich, "BTC");
        list_crossing_market(&cheap, &rich, "ETH");
        cheap.fail_order_book(symbol("cheap", "BTC"), BrokerError::Timeout("slow".into()));
        let list = [Arc::clone(&cheap), Arc::clone(&rich)];

        let scanner = OpportunityScanner::new(
            brokers(&list),
            ScannerConfig::default().with_fail_fast(true),
        );
        let report = scanner
            .scan_all(snapshot(&list, &pairs(&["BTC", "ETH"])).await)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.stats.pairs_failed, 1);
        assert_eq!(report.opportunities.len(), 1);
    }
}
