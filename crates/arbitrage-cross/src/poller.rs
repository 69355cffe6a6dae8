//! Periodic polling loop.
//!
//! Every cycle pulls top-of-book quotes from all venues at once, re-indexes
//! them into a [`MarketSnapshot`], and hands the snapshot to the
//! [`OpportunityScanner`]. A venue that fails to answer is left out of that
//! cycle only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use venue_arb_core::{AssetPair, PollerSettings};

use crate::detector::BrokerMap;
use crate::error::StartupError;
use crate::scanner::{OpportunityScanner, ScanStats};
use crate::types::MarketSnapshot;

// =============================================================================
// Poller Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Stop after this many cycles. `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_cycles: None,
        }
    }
}

impl PollerConfig {
    #[must_use]
    pub fn from_settings(settings: &PollerSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            max_cycles: settings.max_cycles,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }
}

// =============================================================================
// Cycle Statistics
// =============================================================================

/// What one polling cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// 1-based cycle number.
    pub cycle: u64,
    pub venues_polled: usize,
    /// Venues whose quote request failed and were left out.
    pub venues_failed: usize,
    /// Quotes received across all venues.
    pub quotes_received: usize,
    pub scan: ScanStats,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Totals over every cycle of a [`Poller::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub venue_failures: usize,
    pub scan: ScanStats,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, cycle: &CycleStats) {
        self.cycles += 1;
        self.venue_failures += cycle.venues_failed;
        self.scan.accumulate(&cycle.scan);
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Drives the scanner on a fixed interval until shutdown.
pub struct Poller {
    brokers: Arc<BrokerMap>,
    pairs: Vec<AssetPair>,
    scanner: OpportunityScanner,
    config: PollerConfig,
    shutdown: watch::Receiver<bool>,
    cycles_run: std::sync::atomic::AtomicU64,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("venues", &self.brokers.keys().collect::<Vec<_>>())
            .field("pairs", &self.pairs.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Creates a poller over the scanner's brokers.
    ///
    /// Without [`Self::with_shutdown`] the poller only stops at `max_cycles`.
    #[must_use]
    pub fn new(scanner: OpportunityScanner, pairs: Vec<AssetPair>, config: PollerConfig) -> Self {
        let (_, shutdown) = watch::channel(false);
        Self {
            brokers: Arc::clone(scanner.detector().brokers()),
            pairs,
            scanner,
            config,
            shutdown,
            cycles_run: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Stops the loop (and any running scan) when the channel flips to `true`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    #[must_use]
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    #[must_use]
    pub fn pairs(&self) -> &[AssetPair] {
        &self.pairs
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Loads trading state for every venue. Must succeed before polling.
    ///
    /// # Errors
    ///
    /// Returns the first venue that failed to load its state.
    pub async fn prepare(&self) -> Result<(), StartupError> {
        if self.brokers.is_empty() {
            return Err(StartupError::NoVenues);
        }

        let results = join_all(self.brokers.iter().map(|(name, broker)| async move {
            (name, broker.refresh_venue_state().await)
        }))
        .await;

        for (name, result) in results {
            result.map_err(|source| StartupError::VenueState {
                venue: name.clone(),
                source,
            })?;
            debug!(venue = %name, "Venue state loaded");
        }

        info!(venues = self.brokers.len(), "All venues prepared");
        Ok(())
    }

    /// Fetches quotes from every venue and indexes them by pair.
    ///
    /// Returns the snapshot and the names of venues that failed.
    pub async fn fetch_snapshot(&self) -> (MarketSnapshot, Vec<String>) {
        let pairs = &self.pairs;
        let results = join_all(self.brokers.iter().map(|(name, broker)| async move {
            (name.clone(), broker.get_quote_snapshots(pairs).await)
        }))
        .await;

        let mut failed = Vec::new();
        let mut per_venue = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(quotes) => {
                    debug!(venue = %name, quotes = quotes.len(), "Quotes received");
                    per_venue.push((name, quotes));
                }
                Err(err) => {
                    warn!(venue = %name, error = %err, "Quote fetch failed, venue skipped this cycle");
                    failed.push(name);
                }
            }
        }

        (MarketSnapshot::from_venue_quotes(per_venue), failed)
    }

    /// Runs exactly one polling cycle.
    pub async fn run_cycle(&self) -> CycleStats {
        let started = Instant::now();
        let cycle = self
            .cycles_run
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;

        let (snapshot, failed) = self.fetch_snapshot().await;
        let quotes_received = snapshot.iter().map(|(_, venues)| venues.len()).sum();

        let report = self
            .scanner
            .scan_all_until(Arc::new(snapshot), self.shutdown.clone())
            .await;

        let stats = CycleStats {
            cycle,
            venues_polled: self.brokers.len(),
            venues_failed: failed.len(),
            quotes_received,
            scan: report.stats,
            elapsed: started.elapsed(),
            cancelled: report.cancelled,
        };

        info!(
            cycle = stats.cycle,
            venues = stats.venues_polled,
            venues_failed = stats.venues_failed,
            quotes = stats.quotes_received,
            pairs_scanned = stats.scan.pairs_scanned,
            pairs_skipped = stats.scan.pairs_skipped,
            pairs_failed = stats.scan.pairs_failed,
            coarse_hits = stats.scan.coarse_hits,
            insufficient_depth = stats.scan.insufficient_depth,
            found = stats.scan.opportunities_found,
            filtered = stats.scan.filtered_by_gate,
            reported = stats.scan.reported,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Cycle complete"
        );

        stats
    }

    /// Polls until shutdown or `max_cycles`.
    pub async fn run(&self) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let mut shutdown = self.shutdown.clone();

        info!(
            pairs = self.pairs.len(),
            venues = self.brokers.len(),
            interval_secs = self.config.poll_interval.as_secs(),
            max_cycles = ?self.config.max_cycles,
            "Polling started"
        );

        while !self.is_shutdown() {
            let stats = self.run_cycle().await;
            summary.record(&stats);

            if stats.cancelled {
                break;
            }
            if self
                .config
                .max_cycles
                .is_some_and(|max| summary.cycles >= max)
            {
                info!(cycles = summary.cycles, "Cycle limit reached");
                break;
            }
            if stats.elapsed > self.config.poll_interval {
                warn!(
                    cycle = stats.cycle,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    interval_ms = self.config.poll_interval.as_millis() as u64,
                    "Cycle took longer than the poll interval"
                );
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() && !self.is_shutdown() {
                        // Sender gone: nobody can request shutdown any more.
                        tokio::time::sleep(self.config.poll_interval).await;
                    }
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(cycles = summary.cycles, "Polling stopped");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBroker;
    use crate::scanner::ScannerConfig;
    use rust_decimal_macros::dec;
    use venue_arb_core::{Broker, BrokerError, OrderBook, QuoteSnapshot, VenueTicker};

    fn btc() -> AssetPair {
        AssetPair::new("BTC", "USDT")
    }

    fn venue(name: &str, bid: rust_decimal::Decimal, ask: rust_decimal::Decimal) -> Arc<MockBroker> {
        let broker = MockBroker::new(name);
        broker.set_market(
            QuoteSnapshot::new(name, VenueTicker::new(format!("{name}BTC"), btc()), bid, ask),
            OrderBook::from_levels(vec![(bid, dec!(1))], vec![(ask, dec!(1))]),
        );
        Arc::new(broker)
    }

    fn poller(list: &[Arc<MockBroker>], config: PollerConfig) -> Poller {
        let brokers: BrokerMap = list
            .iter()
            .map(|b| (b.name().to_string(), Arc::clone(b) as Arc<dyn Broker>))
            .collect();
        let scanner = OpportunityScanner::new(Arc::new(brokers), ScannerConfig::default());
        Poller::new(scanner, vec![btc()], config)
    }

    #[test]
    fn test_config_from_settings() {
        let settings = PollerSettings {
            poll_interval: Duration::from_secs(5),
            max_cycles: Some(3),
        };
        let config = PollerConfig::from_settings(&settings);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_cycles, Some(3));
    }

    #[tokio::test]
    async fn test_prepare_refreshes_every_venue() {
        let a = venue("a", dec!(99), dec!(100));
        let b = venue("b", dec!(99), dec!(100));
        let poller = poller(&[Arc::clone(&a), Arc::clone(&b)], PollerConfig::default());

        poller.prepare().await.unwrap();
        assert_eq!(a.refresh_calls(), 1);
        assert_eq!(b.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_prepare_failure_is_fatal() {
        let a = venue("a", dec!(99), dec!(100));
        let b = venue("b", dec!(99), dec!(100));
        b.fail_refresh(BrokerError::Network("down".into()));
        let poller = poller(&[a, b], PollerConfig::default());

        let err = poller.prepare().await.unwrap_err();
        assert!(matches!(err, StartupError::VenueState { ref venue, .. } if venue == "b"));
    }

    #[tokio::test]
    async fn test_prepare_without_venues() {
        let poller = poller(&[], PollerConfig::default());
        assert!(matches!(poller.prepare().await, Err(StartupError::NoVenues)));
    }

    #[tokio::test]
    async fn test_cycle_finds_opportunity() {
        let a = venue("a", dec!(99), dec!(100));
        let b = venue("b", dec!(120), dec!(121));
        let poller = poller(&[a, b], PollerConfig::default());

        let stats = poller.run_cycle().await;
        assert_eq!(stats.cycle, 1);
        assert_eq!(stats.venues_polled, 2);
        assert_eq!(stats.venues_failed, 0);
        assert_eq!(stats.quotes_received, 2);
        assert_eq!(stats.scan.reported, 1);

        assert_eq!(poller.run_cycle().await.cycle, 2);
    }

    #[tokio::test]
    async fn test_failed_venue_is_excluded() {
        let a = venue("a", dec!(99), dec!(100));
        let b = venue("b", dec!(120), dec!(121));
        let c = venue("c", dec!(130), dec!(131));
        c.fail_quotes(BrokerError::Timeout("ticker".into()));
        let poller = poller(&[a, b, c], PollerConfig::default());

        let (snapshot, failed) = poller.fetch_snapshot().await;
        assert_eq!(failed, vec!["c".to_string()]);
        assert_eq!(snapshot.quotes(&btc()).unwrap().len(), 2);

        let stats = poller.run_cycle().await;
        assert_eq!(stats.venues_failed, 1);
        assert_eq!(stats.scan.reported, 1);
    }

    #[tokio::test]
    async fn test_run_stops_at_max_cycles() {
        let a = venue("a", dec!(99), dec!(100));
        let b = venue("b", dec!(120), dec!(121));
        let config = PollerConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_max_cycles(Some(3));
        let poller = poller(&[a, b], config);

        let summary = poller.run().await;
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.scan.reported, 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_during_sleep() {
        let a = venue("a", dec!(99), dec!(100));
        let b = venue("b", dec!(120), dec!(121));
        let (tx, rx) = watch::channel(false);
        let poller = poller(&[a, b], PollerConfig::default()).with_shutdown(rx);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        // Default interval is 60s; shutdown must cut the sleep short.
        let summary = tokio::time::timeout(Duration::from_secs(5), poller.run())
            .await
            .expect("poller should stop on shutdown");
        assert_eq!(summary.cycles, 1);
    }

    #[tokio::test]
    async fn test_run_does_nothing_when_already_shut_down() {
        let a = venue("a", dec!(99), dec!(100));
        let (_tx, rx) = watch::channel(true);
        let poller = poller(&[a], PollerConfig::default()).with_shutdown(rx);

        assert_eq!(poller.run().await.cycles, 0);
    }
}
