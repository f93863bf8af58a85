//! Pagination retry behavior against a flaky source.

use async_trait::async_trait;
use okx_data_downloader::fetcher::{
    FetchError, FetchResult, PageFetcher, PageSource, RetryPolicy, UnitRecords,
};
use okx_data_downloader::planner::{FetchUnit, PartitionKey, TimeWindow};
use okx_data_downloader::{AssetClass, DataKind, FundingRate, Trade};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::mock_source::trade;

fn day_unit(kind: DataKind) -> FetchUnit {
    FetchUnit {
        asset_class: AssetClass::Swap,
        symbol: "BTC-USDT-SWAP".to_string(),
        kind,
        key: PartitionKey::Day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        max_retry_after: Duration::from_millis(5),
    }
}

/// Fails a fixed number of times with the given error, then serves one page.
struct FlakySource {
    failures_left: AtomicU32,
    error_kind: fn() -> FetchError,
}

impl FlakySource {
    fn new(failures: u32, error_kind: fn() -> FetchError) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicU32::new(failures),
            error_kind,
        })
    }
}

#[async_trait]
impl PageSource for FlakySource {
    async fn trades_page(
        &self,
        _kind: DataKind,
        _symbol: &str,
        window: &TimeWindow,
        after: Option<i64>,
        _limit: usize,
    ) -> FetchResult<Vec<Trade>> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err((self.error_kind)());
        }
        if after.is_some() {
            return Ok(Vec::new());
        }
        Ok(vec![trade(1, window.start_ms + 10, 100, 1)])
    }

    async fn funding_page(
        &self,
        _symbol: &str,
        _window: &TimeWindow,
        _after: Option<i64>,
        _limit: usize,
    ) -> FetchResult<Vec<FundingRate>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_transient_failures_recover_within_ceiling() {
    let source = FlakySource::new(2, || FetchError::Transient("reset".to_string()));
    let fetcher = PageFetcher::new(source).with_retry_policy(fast_retry(5));

    let records = fetcher
        .fetch_unit(&day_unit(DataKind::Trades))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_rate_limited_pages_recover() {
    let source = FlakySource::new(1, || FetchError::RateLimited {
        retry_after: Some(Duration::from_millis(1)),
    });
    let fetcher = PageFetcher::new(source).with_retry_policy(fast_retry(5));

    match fetcher
        .fetch_unit(&day_unit(DataKind::Trades))
        .await
        .unwrap()
    {
        UnitRecords::Trades(trades) => assert_eq!(trades[0].trade_id, 1),
        UnitRecords::Funding(_) => panic!("expected trades"),
    }
}

#[tokio::test]
async fn test_failures_beyond_ceiling_exhaust() {
    let source = FlakySource::new(10, || FetchError::Transient("reset".to_string()));
    let fetcher = PageFetcher::new(source).with_retry_policy(fast_retry(3));

    let err = fetcher
        .fetch_unit(&day_unit(DataKind::Trades))
        .await
        .unwrap_err();
    match err {
        FetchError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_klines_fetch_aggtrade_records() {
    let source = FlakySource::new(0, || FetchError::Transient("unused".to_string()));
    let fetcher = PageFetcher::new(source).with_retry_policy(fast_retry(1));

    // Kline units read trade-shaped records; aggregation happens later.
    let records = fetcher
        .fetch_unit(&day_unit(DataKind::Klines))
        .await
        .unwrap();
    assert!(matches!(records, UnitRecords::Trades(_)));
}
