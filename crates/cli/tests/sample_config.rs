//! The shipped configuration files must stay loadable.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal_macros::dec;
use venue_arb_core::{AssetCatalog, ConfigLoader};

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/Config.toml")
}

#[test]
fn test_sample_config_is_valid() {
    let config = ConfigLoader::load(sample_path()).unwrap();

    assert_eq!(config.scanner.min_profit_ratio, dec!(1.1));
    assert_eq!(config.poller.poll_interval, Duration::from_secs(60));
    // Every shipped venue must serve the spot REST endpoints.
    assert_eq!(config.enabled_venues().count(), config.venues.len());
    assert!(config.venues.len() >= 2);

    let catalog = AssetCatalog::from_config(&config);
    let binance = catalog.venue("Binance").unwrap();
    assert_eq!(binance.len(), config.pairs.len());
}

#[test]
fn test_dev_profile_overlay() {
    let config = ConfigLoader::load_with_profile(sample_path(), Some("dev")).unwrap();

    assert_eq!(config.scanner.min_profit_ratio, dec!(1.01));
    assert_eq!(config.poller.max_cycles, Some(5));
    assert_eq!(config.venues.len(), 2);
}
