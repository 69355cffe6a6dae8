use clap::{Parser, Subcommand};

mod commands;

use commands::{CheckConfigArgs, MatchBooksArgs, ScanArgs};

#[derive(Parser)]
#[command(name = "venue-arb")]
#[command(about = "Cross-venue spot arbitrage opportunity scanner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll all configured venues and report arbitrage opportunities
    Scan(ScanArgs),
    /// Cross two order books offline and print the resulting trade plan
    MatchBooks(MatchBooksArgs),
    /// Load and validate a configuration file, then print the venue catalog
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Scan(args) => commands::run_scan(args).await,
        Commands::MatchBooks(args) => commands::run_match_books(&args),
        Commands::CheckConfig(args) => commands::run_check_config(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["venue-arb", "scan"]).unwrap();
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.config.to_str(), Some("config/Config.toml"));
                assert_eq!(args.cycles, None);
                assert_eq!(args.min_profit_ratio, None);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_scan_overrides() {
        let cli = Cli::try_parse_from([
            "venue-arb",
            "scan",
            "--config",
            "custom.toml",
            "--profile",
            "dev",
            "--cycles",
            "3",
            "--min-profit-ratio",
            "1.02",
            "--max-budget",
            "250",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.config.to_str(), Some("custom.toml"));
                assert_eq!(args.profile.as_deref(), Some("dev"));
                assert_eq!(args.cycles, Some(3));
                assert_eq!(args.min_profit_ratio, Some(dec!(1.02)));
                assert_eq!(args.max_budget, Some(dec!(250)));
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_match_books() {
        let cli = Cli::try_parse_from([
            "venue-arb",
            "match-books",
            "--asks",
            "asks.json",
            "--bids",
            "bids.json",
        ])
        .unwrap();
        match cli.command {
            Commands::MatchBooks(args) => {
                assert_eq!(args.min_profit_ratio, dec!(1.1));
                assert_eq!(args.max_budget, dec!(1000));
            }
            _ => panic!("expected match-books"),
        }
    }

    #[test]
    fn test_match_books_requires_both_sides() {
        assert!(Cli::try_parse_from(["venue-arb", "match-books", "--asks", "a.json"]).is_err());
    }
}
