//! Error types for opportunity scanning.
//!
//! A [`ScanError`] only ever affects the asset pair it was raised for; the
//! scanner logs it, counts it, and moves on. A [`StartupError`] means a venue
//! could not be prepared at all and the process should not start polling.

use thiserror::Error;
use venue_arb_core::{AssetPair, BrokerError, VenueName};

/// Errors raised while scanning a single asset pair.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A quote referenced a venue with no registered broker.
    #[error("no broker registered for venue {venue}")]
    UnknownVenue {
        /// The venue name found in the snapshot.
        venue: VenueName,
    },

    /// A venue call failed.
    #[error("{operation} for {pair} on {venue} failed: {source}")]
    Venue {
        /// Venue that failed.
        venue: VenueName,
        /// Pair being scanned.
        pair: AssetPair,
        /// Which call failed (e.g. "order book").
        operation: &'static str,
        /// Underlying venue error.
        #[source]
        source: BrokerError,
    },

    /// The scan was cancelled before it finished.
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Creates an unknown venue error.
    pub fn unknown_venue(venue: impl Into<VenueName>) -> Self {
        Self::UnknownVenue {
            venue: venue.into(),
        }
    }

    /// Wraps a venue error with the pair and call it happened in.
    pub fn venue(
        venue: impl Into<VenueName>,
        pair: &AssetPair,
        operation: &'static str,
        source: BrokerError,
    ) -> Self {
        Self::Venue {
            venue: venue.into(),
            pair: pair.clone(),
            operation,
            source,
        }
    }

    /// Returns true if the pair may scan cleanly on a later cycle.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Venue { source, .. } => source.is_transient() || source.is_item_level(),
            Self::Cancelled => true,
            Self::UnknownVenue { .. } => false,
        }
    }
}

/// Errors that prevent polling from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A venue's trading state could not be loaded.
    #[error("failed to load venue state for {venue}: {source}")]
    VenueState {
        /// Venue that failed.
        venue: VenueName,
        /// Underlying venue error.
        #[source]
        source: BrokerError,
    },

    /// No brokers were registered.
    #[error("no venues registered")]
    NoVenues,
}
