//! Live OKX page source
//!
//! [`PageSource`] implementation backed by the OKX REST API. Each method
//! performs exactly one request attempt; retries and pagination live in
//! [`crate::fetcher::PageFetcher`].

use crate::fetcher::http::OkxHttpClient;
use crate::fetcher::parser::OkxParser;
use crate::fetcher::{FetchResult, PageSource};
use crate::planner::TimeWindow;
use crate::{DataKind, FundingRate, Trade};
use async_trait::async_trait;

/// Public trade history endpoint. OKX serves its public trade records in
/// already-aggregated form, so trades and aggtrades read the same endpoint.
const TRADES_ENDPOINT: &str = "/api/v5/market/history-trades";

/// Funding rate history endpoint.
const FUNDING_ENDPOINT: &str = "/api/v5/public/funding-rate-history";

/// [`PageSource`] over the OKX REST API.
#[derive(Clone)]
pub struct OkxRestSource {
    http: OkxHttpClient,
}

impl OkxRestSource {
    /// Wrap an HTTP client.
    pub fn new(http: OkxHttpClient) -> Self {
        Self { http }
    }
}

/// Query parameters for one trade page request.
///
/// The history endpoints page newest-first: `after` returns records older
/// than the given value. The first page seeks to the window end by
/// timestamp (`type=2`); later pages continue backward from the oldest
/// trade id of the previous page (`type=1`). Records that fall before the
/// window start are filtered out upstream and end the unit.
fn trade_params(
    symbol: &str,
    window: &TimeWindow,
    after: Option<i64>,
    limit: usize,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("instId", symbol.to_string()),
        ("limit", limit.to_string()),
    ];
    match after {
        Some(cursor) => {
            params.push(("type", "1".to_string()));
            params.push(("after", cursor.to_string()));
        }
        None => {
            params.push(("type", "2".to_string()));
            params.push(("after", window.end_ms.to_string()));
        }
    }
    params
}

/// Query parameters for one funding rate page request.
///
/// Same backward walk as trades: `after` returns settlements with a
/// funding time earlier than the given value, starting from the window end.
fn funding_params(
    symbol: &str,
    window: &TimeWindow,
    after: Option<i64>,
    limit: usize,
) -> Vec<(&'static str, String)> {
    vec![
        ("instId", symbol.to_string()),
        ("limit", limit.to_string()),
        ("after", after.unwrap_or(window.end_ms).to_string()),
    ]
}

#[async_trait]
impl PageSource for OkxRestSource {
    async fn trades_page(
        &self,
        _kind: DataKind,
        symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        limit: usize,
    ) -> FetchResult<Vec<Trade>> {
        let params = trade_params(symbol, window, after, limit);
        let body = self.http.get_json(TRADES_ENDPOINT, &params).await?;
        let rows = OkxParser::unwrap_envelope(body)?;
        OkxParser::parse_trades(rows)
    }

    async fn funding_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        limit: usize,
    ) -> FetchResult<Vec<FundingRate>> {
        let params = funding_params(symbol, window, after, limit);
        let body = self.http.get_json(FUNDING_ENDPOINT, &params).await?;
        let rows = OkxParser::unwrap_envelope(body)?;
        OkxParser::parse_funding_rates(rows)
    }
}
