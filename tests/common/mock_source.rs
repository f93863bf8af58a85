//! Shared in-memory page source for scheduler and pagination tests.

use async_trait::async_trait;
use okx_data_downloader::fetcher::{FetchError, FetchResult, PageSource};
use okx_data_downloader::planner::TimeWindow;
use okx_data_downloader::{DataKind, FundingRate, Trade, TradeSide};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build a trade with integer price and size.
pub fn trade(id: i64, ts: i64, price: i64, size: i64) -> Trade {
    Trade {
        trade_id: id,
        side: TradeSide::Buy,
        size: Decimal::from(size),
        price: Decimal::from(price),
        created_time: ts,
    }
}

/// Build a funding rate settlement.
pub fn funding_rate(ts: i64) -> FundingRate {
    FundingRate {
        contract_type: "SWAP".to_string(),
        funding_rate: Decimal::new(1, 4),
        real_funding_rate: Decimal::new(9, 5),
        funding_time: ts,
    }
}

/// In-memory [`PageSource`] serving canned records keyed by
/// `(symbol, window start)`. Tracks total page calls and the in-flight
/// high-water mark so tests can assert the concurrency bound.
#[derive(Default)]
pub struct MockSource {
    trades: Mutex<HashMap<(String, i64), Vec<Trade>>>,
    funding: Mutex<HashMap<(String, i64), Vec<FundingRate>>>,
    failing_symbols: Mutex<Vec<String>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold each page call open for `delay` so calls overlap.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn insert_trades(&self, symbol: &str, window_start: i64, trades: Vec<Trade>) {
        self.trades
            .lock()
            .unwrap()
            .insert((symbol.to_string(), window_start), trades);
    }

    pub fn insert_funding(&self, symbol: &str, window_start: i64, rates: Vec<FundingRate>) {
        self.funding
            .lock()
            .unwrap()
            .insert((symbol.to_string(), window_start), rates);
    }

    /// Every page request for this symbol fails fatally.
    pub fn fail_symbol(&self, symbol: &str) {
        self.failing_symbols.lock().unwrap().push(symbol.to_string());
    }

    /// Total page requests served (including failures).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open page requests observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn track_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_failure(&self, symbol: &str) -> FetchResult<()> {
        if self
            .failing_symbols
            .lock()
            .unwrap()
            .iter()
            .any(|s| s == symbol)
        {
            return Err(FetchError::Client(format!("no such instrument: {symbol}")));
        }
        Ok(())
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn trades_page(
        &self,
        _kind: DataKind,
        symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        _limit: usize,
    ) -> FetchResult<Vec<Trade>> {
        self.track_call().await;
        self.release();
        self.check_failure(symbol)?;

        // Everything fits in one page; the cursor request gets the empty
        // page that ends pagination.
        if after.is_some() {
            return Ok(Vec::new());
        }
        Ok(self
            .trades
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), window.start_ms))
            .cloned()
            .unwrap_or_default())
    }

    async fn funding_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        _limit: usize,
    ) -> FetchResult<Vec<FundingRate>> {
        self.track_call().await;
        self.release();
        self.check_failure(symbol)?;

        if after.is_some() {
            return Ok(Vec::new());
        }
        Ok(self
            .funding
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), window.start_ms))
            .cloned()
            .unwrap_or_default())
    }
}
