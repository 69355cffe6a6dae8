//! Offline order book matching.
//!
//! Reads the buy venue's asks and the sell venue's bids from JSON files and
//! prints the trade plan the matcher would produce. Each file holds an array
//! of `{"price": "...", "quantity": "..."}` levels in any order.

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};

use venue_arb_core::{Offer, OrderBook};
use venue_arb_cross::{MatcherConfig, OrderBookMatcher, TradePlan};

/// Arguments for the match-books command.
#[derive(Args, Debug, Clone)]
pub struct MatchBooksArgs {
    /// JSON file with the asks of the venue to buy on
    #[arg(long)]
    pub asks: PathBuf,

    /// JSON file with the bids of the venue to sell on
    #[arg(long)]
    pub bids: PathBuf,

    /// A level only matches while bid > ask * ratio
    #[arg(long, default_value = "1.1")]
    pub min_profit_ratio: Decimal,

    /// Maximum quote currency to spend
    #[arg(long, default_value = "1000")]
    pub max_budget: Decimal,
}

#[derive(Debug, Serialize)]
struct MatchOutput {
    #[serde(flatten)]
    plan: TradePlan,
    gross_profit: Decimal,
    profit_ratio: Decimal,
}

fn read_levels(path: &Path) -> Result<Vec<(Decimal, Decimal)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let offers: Vec<Offer> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of price levels", path.display()))?;
    Ok(offers.into_iter().map(|o| (o.price, o.quantity)).collect())
}

fn match_files(args: &MatchBooksArgs) -> Result<TradePlan> {
    let buy_book = OrderBook::from_levels(Vec::new(), read_levels(&args.asks)?);
    let sell_book = OrderBook::from_levels(read_levels(&args.bids)?, Vec::new());

    let matcher =
        OrderBookMatcher::with_config(MatcherConfig::new(args.min_profit_ratio, args.max_budget));
    Ok(matcher.match_books(&buy_book, &sell_book))
}

/// Runs the match-books command.
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed.
pub fn run_match_books(args: &MatchBooksArgs) -> Result<()> {
    let plan = match_files(args)?;

    if plan.is_empty() {
        tracing::info!("No executable volume between the two books");
    }

    let output = MatchOutput {
        gross_profit: plan.gross_profit(),
        profit_ratio: plan.profit_ratio(),
        plan,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
