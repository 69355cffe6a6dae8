//! In-memory venue for tests and offline dry runs.
//!
//! [`MockBroker`] serves canned quotes and order books, can be told to fail
//! specific calls, and records how it was used (call counts and the peak
//! number of concurrent order book requests).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use venue_arb_core::{AssetPair, Broker, BrokerError, OrderBook, QuoteSnapshot, Result, VenueTicker};

#[derive(Debug, Default)]
struct MockState {
    quotes: BTreeMap<AssetPair, QuoteSnapshot>,
    books: BTreeMap<String, OrderBook>,
    failing_books: BTreeMap<String, BrokerError>,
    quotes_error: Option<BrokerError>,
    refresh_error: Option<BrokerError>,
    buy_blocked: BTreeSet<String>,
    sell_blocked: BTreeSet<String>,
    gate_errors: BTreeSet<String>,
}

/// Scriptable [`Broker`] backed by in-memory maps.
#[derive(Debug)]
pub struct MockBroker {
    name: String,
    state: Mutex<MockState>,
    book_delay: Option<Duration>,
    book_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl MockBroker {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockState::default()),
            book_delay: None,
            book_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every order book request sleep before answering.
    #[must_use]
    pub fn with_book_delay(mut self, delay: Duration) -> Self {
        self.book_delay = Some(delay);
        self
    }

    /// Adds a quote and the order book served for its ticker.
    #[must_use]
    pub fn with_market(self, quote: QuoteSnapshot, book: OrderBook) -> Self {
        self.set_market(quote, book);
        self
    }

    pub fn set_market(&self, mut quote: QuoteSnapshot, book: OrderBook) {
        quote.venue.clone_from(&self.name);
        let mut state = self.state.lock();
        state.books.insert(quote.ticker.symbol.clone(), book);
        state.quotes.insert(quote.pair.clone(), quote);
    }

    pub fn fail_order_book(&self, symbol: impl Into<String>, error: BrokerError) {
        self.state.lock().failing_books.insert(symbol.into(), error);
    }

    pub fn fail_quotes(&self, error: BrokerError) {
        self.state.lock().quotes_error = Some(error);
    }

    pub fn fail_refresh(&self, error: BrokerError) {
        self.state.lock().refresh_error = Some(error);
    }

    /// Makes `can_buy_and_withdraw` answer false for the symbol.
    pub fn block_buying(&self, symbol: impl Into<String>) {
        self.state.lock().buy_blocked.insert(symbol.into());
    }

    /// Makes `can_deposit_and_sell` answer false for the symbol.
    pub fn block_selling(&self, symbol: impl Into<String>) {
        self.state.lock().sell_blocked.insert(symbol.into());
    }

    /// Makes both gates return an error for the symbol.
    pub fn fail_gates(&self, symbol: impl Into<String>) {
        self.state.lock().gate_errors.insert(symbol.into());
    }

    #[must_use]
    pub fn book_calls(&self) -> usize {
        self.book_calls.load(Ordering::SeqCst)
    }

    /// Highest number of order book requests observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn gate(&self, ticker: &VenueTicker, blocked: impl Fn(&MockState) -> bool) -> Result<bool> {
        let state = self.state.lock();
        if state.gate_errors.contains(&ticker.symbol) {
            return Err(BrokerError::api(503, "gate check unavailable"));
        }
        Ok(!blocked(&state))
    }
}

#[async_trait]
impl Broker for MockBroker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote_snapshots(
        &self,
        pairs: &[AssetPair],
    ) -> Result<BTreeMap<AssetPair, QuoteSnapshot>> {
        let state = self.state.lock();
        if let Some(err) = &state.quotes_error {
            return Err(err.clone());
        }
        Ok(pairs
            .iter()
            .filter_map(|pair| state.quotes.get(pair).map(|q| (pair.clone(), q.clone())))
            .collect())
    }

    async fn get_order_book(&self, ticker: &VenueTicker) -> Result<OrderBook> {
        self.book_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.book_delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let state = self.state.lock();
            if let Some(err) = state.failing_books.get(&ticker.symbol) {
                Err(err.clone())
            } else {
                state
                    .books
                    .get(&ticker.symbol)
                    .cloned()
                    .ok_or_else(|| BrokerError::unknown_ticker(&ticker.symbol))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn can_buy_and_withdraw(&self, ticker: &VenueTicker) -> Result<bool> {
        self.gate(ticker, |state| state.buy_blocked.contains(&ticker.symbol))
    }

    async fn can_deposit_and_sell(&self, ticker: &VenueTicker) -> Result<bool> {
        self.gate(ticker, |state| state.sell_blocked.contains(&ticker.symbol))
    }

    async fn refresh_venue_state(&self) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match &self.state.lock().refresh_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
