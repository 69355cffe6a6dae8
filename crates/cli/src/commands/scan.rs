//! Polling scanner command.
//!
//! Loads the configuration, builds one venue adapter per enabled venue, and
//! runs the polling loop until Ctrl+C or the cycle limit.
//!
//! ## Example Usage
//!
//! ```bash
//! # Run until Ctrl+C
//! cargo run -p venue-arb-cli -- scan --config config/Config.toml
//!
//! # Three cycles with a lower threshold
//! cargo run -p venue-arb-cli -- scan --cycles 3 --min-profit-ratio 1.02
//! ```

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use venue_arb_core::{AppConfig, AssetCatalog, Broker, ConfigLoader, VenueKind};
use venue_arb_cross::{BrokerMap, OpportunityScanner, Poller, PollerConfig, RunSummary, ScannerConfig};
use venue_arb_spot::SpotVenue;

/// Arguments for the scan command.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Profile overlay, e.g. "dev" loads Config.dev.toml on top
    #[arg(long, env = "VENUE_ARB_PROFILE")]
    pub profile: Option<String>,

    /// Stop after this many polling cycles
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Override the configured minimum bid/ask ratio
    #[arg(long)]
    pub min_profit_ratio: Option<Decimal>,

    /// Override the configured budget per opportunity
    #[arg(long)]
    pub max_budget: Option<Decimal>,
}

impl ScanArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(ratio) = self.min_profit_ratio {
            config.scanner.min_profit_ratio = ratio;
        }
        if let Some(budget) = self.max_budget {
            config.scanner.max_budget = budget;
        }
        if self.cycles.is_some() {
            config.poller.max_cycles = self.cycles;
        }
    }
}

/// Configuration summary for logging.
struct ConfigSummary<'a> {
    config: &'a AppConfig,
}

impl<'a> ConfigSummary<'a> {
    fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    fn log(&self) {
        let venues: Vec<&str> = self
            .config
            .enabled_venues()
            .map(|v| v.name.as_str())
            .collect();

        tracing::info!("========================================");
        tracing::info!("     CROSS-VENUE ARBITRAGE SCANNER      ");
        tracing::info!("========================================");
        tracing::info!("Venues:                {}", venues.join(", "));
        tracing::info!("Pairs Tracked:         {}", self.config.pairs.len());
        tracing::info!("----------------------------------------");
        tracing::info!("Thresholds:");
        tracing::info!("  Min Profit Ratio:    {}", self.config.scanner.min_profit_ratio);
        tracing::info!("  Max Budget:          {}", self.config.scanner.max_budget);
        tracing::info!("----------------------------------------");
        tracing::info!("Execution:");
        tracing::info!("  Concurrent Scans:    {}", self.config.scanner.max_concurrent_scans);
        tracing::info!("  Fail Fast:           {}", self.config.scanner.fail_fast);
        tracing::info!("  Poll Interval:       {}s", self.config.poller.poll_interval.as_secs());
        match self.config.poller.max_cycles {
            Some(cycles) => tracing::info!("  Cycles:              {}", cycles),
            None => tracing::info!("  Cycles:              until Ctrl+C"),
        }
        tracing::info!("========================================");
    }
}

fn log_summary(summary: &RunSummary) {
    let elapsed_mins = summary.elapsed.as_secs_f64() / 60.0;
    tracing::info!("========================================");
    tracing::info!("         SESSION SUMMARY                ");
    tracing::info!("========================================");
    tracing::info!("Runtime:              {:.1} minutes", elapsed_mins);
    tracing::info!("Cycles Completed:     {}", summary.cycles);
    tracing::info!("Venue Failures:       {}", summary.venue_failures);
    tracing::info!("----------------------------------------");
    tracing::info!("Pairs:");
    tracing::info!("  Scanned:            {}", summary.scan.pairs_scanned);
    tracing::info!("  Skipped:            {}", summary.scan.pairs_skipped);
    tracing::info!("  Failed:             {}", summary.scan.pairs_failed);
    tracing::info!("----------------------------------------");
    tracing::info!("Opportunities:");
    tracing::info!("  Coarse Hits:        {}", summary.scan.coarse_hits);
    tracing::info!("  Too Shallow:        {}", summary.scan.insufficient_depth);
    tracing::info!("  Found:              {}", summary.scan.opportunities_found);
    tracing::info!("  Blocked by Gate:    {}", summary.scan.filtered_by_gate);
    tracing::info!("  Reported:           {}", summary.scan.reported);
    tracing::info!("========================================");
}

/// Creates one broker per enabled venue.
fn build_brokers(config: &AppConfig, catalog: &AssetCatalog) -> Result<BrokerMap> {
    let mut brokers = BrokerMap::new();
    for venue in config.enabled_venues() {
        let broker: Arc<dyn Broker> = match venue.kind {
            VenueKind::SpotRest => Arc::new(
                SpotVenue::from_config(venue, catalog.pairs())
                    .with_context(|| format!("failed to set up venue {}", venue.name))?,
            ),
        };
        brokers.insert(venue.name.clone(), broker);
    }
    Ok(brokers)
}

/// Runs the scan command.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded or is invalid
/// - A venue adapter cannot be built
/// - A venue's trading state cannot be loaded at startup
pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let mut config = ConfigLoader::load_with_profile(&args.config, args.profile.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate().context("invalid configuration after overrides")?;

    ConfigSummary::new(&config).log();

    let catalog = AssetCatalog::from_config(&config);
    let brokers = Arc::new(build_brokers(&config, &catalog)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            let _ = shutdown_tx.send(true);
        }
    });

    let scanner = OpportunityScanner::new(brokers, ScannerConfig::from_settings(&config.scanner));
    let poller = Poller::new(
        scanner,
        catalog.pairs().to_vec(),
        PollerConfig::from_settings(&config.poller),
    )
    .with_shutdown(shutdown_rx);

    tracing::info!("Loading venue state...");
    poller
        .prepare()
        .await
        .context("failed to prepare venues")?;

    tracing::info!("Starting polling loop, press Ctrl+C to stop");
    let summary = poller.run().await;
    log_summary(&summary);

    Ok(())
}
