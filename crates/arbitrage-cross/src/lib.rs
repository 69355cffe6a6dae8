//! Cross-venue arbitrage opportunity detection.
//!
//! When the same asset trades on several venues, one venue's best bid can sit
//! above another venue's best ask. Buying on the cheap venue and selling on
//! the expensive one captures the spread:
//!
//! ```text
//! Venue A:  bid 115 / ask 120
//! Venue B:  bid  90 / ask  95
//!
//! Buy on B @ 95, sell on A @ 115
//!   ratio 115 / 95 = 1.21 > min_profit_ratio
//! ```
//!
//! # Modules
//!
//! - [`matcher`]: Crosses one venue's asks against another's bids under a budget
//! - [`detector`]: Finds the first crossing venue pair for one asset pair and sizes it
//! - [`scanner`]: Scans every asset pair concurrently and applies transfer gates
//! - [`poller`]: Fetches quotes on an interval and drives the scanner
//! - [`sink`]: Where reported opportunities go
//! - [`mock`]: In-memory venue for tests and dry runs
//!
//! # Example
//!
//! ```ignore
//! use venue_arb_cross::{OpportunityScanner, Poller, PollerConfig, ScannerConfig};
//!
//! let scanner = OpportunityScanner::new(brokers, ScannerConfig::default());
//! let poller = Poller::new(scanner, pairs, PollerConfig::default())
//!     .with_shutdown(shutdown_rx);
//!
//! poller.prepare().await?;
//! let summary = poller.run().await;
//! ```
//!
//! Opportunities are gross of fees and transfer costs. Nothing here places
//! orders.

pub mod detector;
pub mod error;
pub mod matcher;
pub mod mock;
pub mod poller;
pub mod scanner;
pub mod sink;
pub mod types;

// Re-export main types for convenience
pub use detector::{BrokerMap, OpportunityDetector, PairOutcome};
pub use error::{ScanError, StartupError};
pub use matcher::{match_offers, MatcherConfig, OrderBookMatcher};
pub use mock::MockBroker;
pub use poller::{CycleStats, Poller, PollerConfig, RunSummary};
pub use scanner::{OpportunityScanner, ScanReport, ScanStats, ScannerConfig};
pub use sink::{ChannelSink, LogSink, OpportunitySink};
pub use types::{MarketSnapshot, Opportunity, TradePlan};
