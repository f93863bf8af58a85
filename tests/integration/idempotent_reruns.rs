//! Re-running against an existing save directory must not re-fetch.

use chrono::NaiveDate;
use okx_data_downloader::downloader::Scheduler;
use okx_data_downloader::fetcher::PageFetcher;
use okx_data_downloader::planner::{plan_units, FetchUnit};
use okx_data_downloader::store::CsvPartitionStore;
use okx_data_downloader::symbols::SymbolInfo;
use okx_data_downloader::{AssetClass, DataKind};
use std::sync::Arc;
use tempfile::TempDir;

use crate::common::mock_source::{trade, MockSource};

fn units() -> Vec<FetchUnit> {
    let symbols = vec![SymbolInfo {
        inst_id: "BTC-USDT-SWAP".to_string(),
        base: "BTC".to_string(),
        quote: "USDT".to_string(),
        available_since: None,
        available_to: None,
    }];
    plan_units(
        AssetClass::Swap,
        &symbols,
        DataKind::Trades,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
    )
}

fn seeded_source() -> Arc<MockSource> {
    let source = MockSource::new();
    for unit in units() {
        let start = unit.window().start_ms;
        source.insert_trades(
            &unit.symbol,
            start,
            vec![trade(start, start + 1_000, 100, 1)],
        );
    }
    source
}

#[tokio::test]
async fn test_second_run_skips_every_unit_without_network_calls() {
    let source = seeded_source();
    let dir = TempDir::new().unwrap();

    let first = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .run(units(), 2)
    .await;
    assert_eq!(first.completed, 3);

    let calls_after_first = source.calls();
    assert!(calls_after_first > 0);

    // Fresh scheduler over the same save directory, as a re-run would be.
    let second = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .run(units(), 2)
    .await;

    assert_eq!(second.completed, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(source.calls(), calls_after_first);
}

#[tokio::test]
async fn test_overwrite_refetches_existing_partitions() {
    let source = seeded_source();
    let dir = TempDir::new().unwrap();

    Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .run(units(), 2)
    .await;
    let calls_after_first = source.calls();

    let second = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .with_overwrite(true)
    .run(units(), 2)
    .await;

    assert_eq!(second.completed, 3);
    assert_eq!(second.skipped, 0);
    assert!(source.calls() > calls_after_first);
}

#[tokio::test]
async fn test_empty_partition_marker_prevents_refetch() {
    // Source has no data at all; first run writes header-only markers.
    let source = MockSource::new();
    let dir = TempDir::new().unwrap();

    let first = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .run(units(), 2)
    .await;
    assert_eq!(first.completed, 3);
    let calls_after_first = source.calls();

    let second = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .run(units(), 2)
    .await;

    assert_eq!(second.skipped, 3);
    assert_eq!(source.calls(), calls_after_first);
}

#[tokio::test]
async fn test_unwritten_empty_partitions_are_refetched() {
    let source = MockSource::new();
    let dir = TempDir::new().unwrap();
    let store = || {
        Arc::new(
            CsvPartitionStore::new(dir.path()).with_write_empty_partitions(false),
        )
    };

    Scheduler::new(PageFetcher::new(source.clone()), store())
        .run(units(), 2)
        .await;
    let calls_after_first = source.calls();

    let second = Scheduler::new(PageFetcher::new(source.clone()), store())
        .run(units(), 2)
        .await;

    // Without marker files the empty windows are fetched again.
    assert_eq!(second.skipped, 0);
    assert!(source.calls() > calls_after_first);
}
