//! Spot REST venue adapter.
//!
//! Talks to Binance-compatible public spot APIs (MEXC, Binance and others
//! sharing the `/api/v3` layout) and exposes them as a [`venue_arb_core::Broker`].
//!
//! # Modules
//!
//! - [`client`]: Rate-limited REST client
//! - [`types`]: Wire types for book tickers, depth, and exchange info
//! - [`venue`]: `Broker` implementation with cached symbol status
//! - [`error`]: Error types

pub mod client;
pub mod error;
pub mod types;
pub mod venue;

pub use client::{SpotClientConfig, SpotRestClient};
pub use error::{Result, SpotError};
pub use types::{BookTicker, DepthSnapshot, ExchangeInfo, SymbolInfo};
pub use venue::SpotVenue;
