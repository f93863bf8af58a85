//! Paginated page fetching
//!
//! One [`PageFetcher`] drives the full pagination cycle for a single fetch
//! unit: issue a page request, classify failures, retry transient ones with
//! backoff, advance the cursor, and accumulate records in window order.
//! The remote source sits behind the [`PageSource`] trait so the pagination
//! and retry logic is testable without a network.

use crate::planner::TimeWindow;
use crate::{DataKind, FundingRate, Trade};
use async_trait::async_trait;
use std::time::Duration;

pub mod http;
pub mod okx;
pub mod page;
pub mod parser;
pub mod retry;

pub use okx::OkxRestSource;
pub use page::{PageFetcher, UnitRecords};
pub use retry::{RetryDecision, RetryPolicy};

/// Fetch errors, classified by retryability
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Retryable: timeouts, connection resets, 5xx responses
    #[error("transient network error: {0}")]
    Transient(String),

    /// Retryable with mandated backoff: HTTP 429 or equivalent
    #[error("rate limited (retry-after: {retry_after:?})")]
    RateLimited {
        /// Source-provided retry-after hint, if any
        retry_after: Option<Duration>,
    },

    /// Fatal for the unit: malformed request, 4xx other than rate-limit
    #[error("client error: {0}")]
    Client(String),

    /// Fatal for the unit: response body could not be interpreted
    #[error("parse error: {0}")]
    Parse(String),

    /// Retry ceiling reached for a page request
    #[error("fetch exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Description of the last error observed
        last: String,
    },

    /// Fatal for the unit: the page ceiling was hit before the window
    /// drained, so the accumulated records cannot be trusted as complete
    #[error("page ceiling hit after {pages} pages without draining the window")]
    PageCeiling {
        /// Pages fetched before giving up
        pages: usize,
    },
}

impl FetchError {
    /// Whether this error class may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::RateLimited { .. })
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// A paginated remote source of raw records.
///
/// One call fetches one page. The first page (`after = None`) must be
/// positioned at the unit's window; later pages continue from the cursor,
/// which is the last record of the previous page (trade id for trades,
/// funding time for funding rates). In-page ordering is unspecified: the
/// fetcher filters to the window, deduplicates, and sorts. A page shorter
/// than `limit` signals end of data; a non-empty page with no in-window
/// records signals the window is drained.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of trade-shaped records.
    ///
    /// `kind` selects the trades or aggtrades endpoint; `after` is the
    /// trade-id cursor from the previous page, `None` for the first page.
    async fn trades_page(
        &self,
        kind: DataKind,
        symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        limit: usize,
    ) -> FetchResult<Vec<Trade>>;

    /// Fetch one page of funding rate records.
    ///
    /// `after` is the funding-time cursor from the previous page.
    async fn funding_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        limit: usize,
    ) -> FetchResult<Vec<FundingRate>>;
}
