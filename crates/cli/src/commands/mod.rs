//! CLI commands for the cross-venue arbitrage scanner.

pub mod check_config;
pub mod match_books;
pub mod scan;

pub use check_config::{run_check_config, CheckConfigArgs};
pub use match_books::{run_match_books, MatchBooksArgs};
pub use scan::{run_scan, ScanArgs};
