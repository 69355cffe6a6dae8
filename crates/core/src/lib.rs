pub mod catalog;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use catalog::{AssetCatalog, VenueCatalog};
pub use config::{AppConfig, ConfigError, PollerSettings, ScannerSettings, VenueConfig, VenueKind};
pub use config_loader::ConfigLoader;
pub use error::{BrokerError, Result};
pub use traits::Broker;
pub use types::{
    AssetPair, CoinId, Offer, OrderBook, QuoteSnapshot, TickerStatus, VenueName, VenueTicker,
};
