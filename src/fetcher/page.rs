//! Unit-level pagination
//!
//! Drives the full page cycle for one fetch unit: request a page, retry
//! transient failures per the [`RetryPolicy`], advance the cursor from the
//! last record, and stop on a short or empty page or once a page carries no
//! in-window records. Because the cursor is owned here and only advances on
//! success, a retried page never re-fetches data that was already consumed.
//! Hitting the page ceiling is an error, never a truncated success: a
//! partition is only persisted when its window actually drained.

use crate::fetcher::retry::{RetryDecision, RetryPolicy};
use crate::fetcher::{FetchError, FetchResult, PageSource};
use crate::planner::FetchUnit;
use crate::{DataKind, FundingRate, Trade};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default records per page requested from the source.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Hard ceiling on pages per unit, guards against a cursor that stops
/// advancing.
const MAX_PAGES: usize = 10_000;

/// Records accumulated for one completed unit, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitRecords {
    /// Trade-shaped records (trades, aggtrades, kline input)
    Trades(Vec<Trade>),
    /// Funding rate records
    Funding(Vec<FundingRate>),
}

impl UnitRecords {
    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            UnitRecords::Trades(t) => t.len(),
            UnitRecords::Funding(f) => f.len(),
        }
    }

    /// Whether the unit's window held no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches all pages for a unit from a [`PageSource`].
pub struct PageFetcher<S: PageSource> {
    source: Arc<S>,
    retry: RetryPolicy,
    page_limit: usize,
}

impl<S: PageSource> PageFetcher<S> {
    /// Create a fetcher with default retry policy and page limit.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            retry: RetryPolicy::default(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-page record limit.
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Fetch every record in the unit's window.
    ///
    /// Klines fetch aggtrade records; the candle aggregation happens in the
    /// scheduler after the fetch completes.
    pub async fn fetch_unit(&self, unit: &FetchUnit) -> FetchResult<UnitRecords> {
        match unit.kind {
            DataKind::Trades => Ok(UnitRecords::Trades(
                self.fetch_trades(unit, DataKind::Trades).await?,
            )),
            DataKind::AggTrades | DataKind::Klines => Ok(UnitRecords::Trades(
                self.fetch_trades(unit, DataKind::AggTrades).await?,
            )),
            DataKind::SwapRate => Ok(UnitRecords::Funding(self.fetch_funding(unit).await?)),
        }
    }

    async fn fetch_trades(&self, unit: &FetchUnit, kind: DataKind) -> FetchResult<Vec<Trade>> {
        let window = unit.window();
        let mut all = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();
        let mut cursor: Option<i64> = None;

        let mut page_no = 0;
        loop {
            if page_no == MAX_PAGES {
                return Err(FetchError::PageCeiling { pages: page_no });
            }
            page_no += 1;

            let page = self
                .page_with_retry(unit, || {
                    self.source
                        .trades_page(kind, &unit.symbol, &window, cursor, self.page_limit)
                })
                .await?;

            if page.is_empty() {
                debug!(unit = %unit, pages = page_no - 1, "pagination complete (empty page)");
                break;
            }

            let full_page = page.len() >= self.page_limit;
            // Cursor advances even past filtered records so the next page
            // request never revisits this one.
            cursor = page.last().map(|t| t.trade_id);

            let mut in_window = 0usize;
            for trade in page {
                if window.contains(trade.created_time) {
                    in_window += 1;
                    if seen.insert(trade.trade_id) {
                        all.push(trade);
                    }
                }
            }

            // A non-empty page with nothing inside the window means the
            // cursor has walked past it.
            if in_window == 0 {
                debug!(unit = %unit, pages = page_no, "pagination complete (window drained)");
                break;
            }

            if !full_page {
                debug!(unit = %unit, pages = page_no, "pagination complete (short page)");
                break;
            }
        }

        // Stable sort keeps source return order for equal timestamps, which
        // fixes open/close tie-breaking downstream.
        all.sort_by_key(|t| t.created_time);
        Ok(all)
    }

    async fn fetch_funding(&self, unit: &FetchUnit) -> FetchResult<Vec<FundingRate>> {
        let window = unit.window();
        let mut all: Vec<FundingRate> = Vec::new();
        let mut cursor: Option<i64> = None;

        let mut page_no = 0;
        loop {
            if page_no == MAX_PAGES {
                return Err(FetchError::PageCeiling { pages: page_no });
            }
            page_no += 1;

            let page = self
                .page_with_retry(unit, || {
                    self.source
                        .funding_page(&unit.symbol, &window, cursor, self.page_limit)
                })
                .await?;

            if page.is_empty() {
                debug!(unit = %unit, pages = page_no - 1, "pagination complete (empty page)");
                break;
            }

            let full_page = page.len() >= self.page_limit;
            cursor = page.last().map(|r| r.funding_time);

            let mut in_window = 0usize;
            for rate in page {
                if window.contains(rate.funding_time) {
                    in_window += 1;
                    all.push(rate);
                }
            }

            if in_window == 0 {
                debug!(unit = %unit, pages = page_no, "pagination complete (window drained)");
                break;
            }

            if !full_page {
                break;
            }
        }

        all.sort_by_key(|r| r.funding_time);
        Ok(all)
    }

    /// Run one page request through the retry policy.
    ///
    /// Retryable failures sleep and try again up to the attempt ceiling;
    /// hitting the ceiling converts the last error into
    /// [`FetchError::Exhausted`]. Fatal errors surface immediately.
    async fn page_with_retry<T, F, Fut>(&self, unit: &FetchUnit, fetch: F) -> FetchResult<Vec<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult<Vec<T>>>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match fetch().await {
                Ok(page) => return Ok(page),
                Err(err) => match self.retry.decide(attempt, &err) {
                    RetryDecision::Retry(delay) => {
                        warn!(
                            unit = %unit,
                            attempt,
                            max_attempts = self.retry.max_attempts,
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            "page request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp => {
                        if err.is_retryable() {
                            return Err(FetchError::Exhausted {
                                attempts: attempt,
                                last: err.to_string(),
                            });
                        }
                        return Err(err);
                    }
                },
            }
        }
    }
}
