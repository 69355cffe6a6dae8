//! Configuration check command.

use anyhow::Result;
use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;

use venue_arb_core::{AppConfig, AssetCatalog, ConfigLoader};

/// Arguments for the check-config command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Profile overlay, e.g. "dev" loads Config.dev.toml on top
    #[arg(long, env = "VENUE_ARB_PROFILE")]
    pub profile: Option<String>,
}

/// Renders the resolved settings and every venue's symbol for every pair.
fn render(config: &AppConfig) -> String {
    let catalog = AssetCatalog::from_config(config);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "scanner: min_profit_ratio={} max_budget={} max_concurrent_scans={} fail_fast={}",
        config.scanner.min_profit_ratio,
        config.scanner.max_budget,
        config.scanner.max_concurrent_scans,
        config.scanner.fail_fast
    );
    let _ = writeln!(
        out,
        "poller: poll_interval={}s max_cycles={}",
        config.poller.poll_interval.as_secs(),
        config
            .poller
            .max_cycles
            .map_or_else(|| "unbounded".to_string(), |c| c.to_string())
    );

    for venue in catalog.venues() {
        let _ = writeln!(out, "{} ({} pairs)", venue.venue(), venue.len());
        for (pair, symbol) in venue.iter() {
            let _ = writeln!(out, "  {:<12} {symbol}", pair.to_string());
        }
    }

    let disabled: Vec<&str> = config
        .venues
        .iter()
        .filter(|v| !v.enabled)
        .map(|v| v.name.as_str())
        .collect();
    if !disabled.is_empty() {
        let _ = writeln!(out, "disabled: {}", disabled.join(", "));
    }

    out
}

/// Runs the check-config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or is invalid.
pub fn run_check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = ConfigLoader::load_with_profile(&args.config, args.profile.as_deref())?;
    tracing::info!(path = %args.config.display(), "Configuration is valid");
    print!("{}", render(&config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use venue_arb_core::{AssetPair, VenueConfig};

    #[test]
    fn test_render_lists_symbols_per_venue() {
        let gate =
            VenueConfig::new("Gate", "https://api.gateio.ws").with_ticker_format("{base}_{quote}");
        let mut kucoin = VenueConfig::new("KuCoin", "https://api.kucoin.com");
        kucoin.enabled = false;
        let config = AppConfig {
            venues: vec![VenueConfig::new("MEXC", "https://api.mexc.com"), gate, kucoin],
            pairs: vec![AssetPair::new("ETH", "USDT"), AssetPair::new("BTC", "USDT")],
            ..AppConfig::default()
        };

        let out = render(&config);
        assert!(out.contains("Gate (2 pairs)"));
        assert!(out.contains("BTC_USDT"));
        assert!(out.contains("MEXC (2 pairs)"));
        assert!(out.contains("ETHUSDT"));
        assert!(out.contains("disabled: KuCoin"));
        assert!(!out.contains("KuCoin ("));
        assert!(out.contains("max_cycles=unbounded"));
    }
}
