//! Static reference catalog: which pairs are tracked and how each venue
//! spells them.
//!
//! The catalog is built once from configuration and treated as read-only
//! afterwards. Venue adapters use it to turn their own symbols back into
//! [`AssetPair`]s and to build the [`VenueTicker`] links that travel inside
//! quote snapshots.

use crate::config::{AppConfig, VenueConfig};
use crate::types::{AssetPair, CoinId, VenueTicker};
use std::collections::{BTreeMap, HashMap};

/// Symbol mapping for one venue.
#[derive(Debug, Clone, Default)]
pub struct VenueCatalog {
    venue: String,
    by_symbol: HashMap<String, AssetPair>,
    by_pair: BTreeMap<AssetPair, String>,
}

impl VenueCatalog {
    /// Builds the mapping for `pairs` using the venue's ticker format and aliases.
    #[must_use]
    pub fn new(venue: &VenueConfig, pairs: &[AssetPair]) -> Self {
        let spell = |coin: &CoinId| {
            venue
                .aliases
                .get(coin)
                .cloned()
                .unwrap_or_else(|| coin.as_str().to_string())
        };

        let mut catalog = Self {
            venue: venue.name.clone(),
            ..Default::default()
        };

        for pair in pairs {
            let symbol = venue
                .ticker_format
                .replace("{base}", &spell(&pair.base))
                .replace("{quote}", &spell(&pair.quote));
            catalog
                .by_symbol
                .insert(normalise_symbol(&symbol), pair.clone());
            catalog.by_pair.insert(pair.clone(), symbol);
        }

        catalog
    }

    #[must_use]
    pub fn venue(&self) -> &str {
        &self.venue
    }

    /// Looks up the pair a venue symbol refers to. Case-insensitive.
    #[must_use]
    pub fn pair_for_symbol(&self, symbol: &str) -> Option<&AssetPair> {
        self.by_symbol.get(&normalise_symbol(symbol))
    }

    #[must_use]
    pub fn symbol_for_pair(&self, pair: &AssetPair) -> Option<&str> {
        self.by_pair.get(pair).map(String::as_str)
    }

    #[must_use]
    pub fn ticker_for_pair(&self, pair: &AssetPair) -> Option<VenueTicker> {
        self.symbol_for_pair(pair)
            .map(|symbol| VenueTicker::new(symbol, pair.clone()))
    }

    /// Resolves a venue symbol into a ticker, if the symbol is tracked.
    #[must_use]
    pub fn ticker_for_symbol(&self, symbol: &str) -> Option<VenueTicker> {
        self.pair_for_symbol(symbol)
            .and_then(|pair| self.ticker_for_pair(pair))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    /// Tracked pairs with their venue symbols, in pair order.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetPair, &str)> {
        self.by_pair.iter().map(|(pair, symbol)| (pair, symbol.as_str()))
    }
}

/// Catalog for every configured venue.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    pairs: Vec<AssetPair>,
    venues: BTreeMap<String, VenueCatalog>,
}

impl AssetCatalog {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let mut pairs = config.pairs.clone();
        pairs.sort();
        pairs.dedup();

        let venues = config
            .enabled_venues()
            .map(|venue| (venue.name.clone(), VenueCatalog::new(venue, &pairs)))
            .collect();

        Self { pairs, venues }
    }

    /// Tracked pairs, sorted and de-duplicated.
    #[must_use]
    pub fn pairs(&self) -> &[AssetPair] {
        &self.pairs
    }

    #[must_use]
    pub fn venue(&self, name: &str) -> Option<&VenueCatalog> {
        self.venues.get(name)
    }

    pub fn venues(&self) -> impl Iterator<Item = &VenueCatalog> {
        self.venues.values()
    }
}

fn normalise_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
