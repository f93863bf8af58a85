//! End-to-end scheduler runs over a mock source.

use chrono::NaiveDate;
use okx_data_downloader::downloader::Scheduler;
use okx_data_downloader::fetcher::PageFetcher;
use okx_data_downloader::planner::{plan_units, FetchUnit};
use okx_data_downloader::shutdown::Shutdown;
use okx_data_downloader::store::{CsvPartitionStore, PartitionStore};
use okx_data_downloader::symbols::SymbolInfo;
use okx_data_downloader::{AssetClass, DataKind};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::mock_source::{funding_rate, trade, MockSource};

fn symbol(inst_id: &str) -> SymbolInfo {
    SymbolInfo {
        inst_id: inst_id.to_string(),
        base: "BTC".to_string(),
        quote: "USDT".to_string(),
        available_since: None,
        available_to: None,
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn plan(symbols: &[&str], kind: DataKind, from: u32, to: u32) -> Vec<FetchUnit> {
    let infos: Vec<SymbolInfo> = symbols.iter().map(|s| symbol(s)).collect();
    plan_units(AssetClass::Swap, &infos, kind, date(from), date(to))
}

fn seed_trades(source: &MockSource, units: &[FetchUnit]) {
    for unit in units {
        let start = unit.window().start_ms;
        source.insert_trades(
            &unit.symbol,
            start,
            vec![trade(start, start + 10_000, 100, 1)],
        );
    }
}

#[tokio::test]
async fn test_concurrency_bound_is_respected() {
    let source = MockSource::with_delay(Duration::from_millis(20));
    let units = plan(&["BTC-USDT-SWAP"], DataKind::Trades, 1, 8);
    seed_trades(&source, &units);

    let dir = TempDir::new().unwrap();
    let scheduler = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    );

    let summary = scheduler.run(units, 3).await;

    assert_eq!(summary.completed, 8);
    assert!(summary.is_success());
    assert!(
        source.max_in_flight() <= 3,
        "observed {} units in flight",
        source.max_in_flight()
    );
    assert!(source.max_in_flight() >= 2, "units never overlapped");
}

#[tokio::test]
async fn test_failed_units_are_isolated_and_reported_sorted() {
    let source = MockSource::new();
    let units = plan(
        &["BTC-USDT-SWAP", "BAD-USDT-SWAP", "ETH-USDT-SWAP"],
        DataKind::Trades,
        1,
        2,
    );
    seed_trades(&source, &units);
    source.fail_symbol("BAD-USDT-SWAP");

    let dir = TempDir::new().unwrap();
    let store = Arc::new(CsvPartitionStore::new(dir.path()));
    let scheduler = Scheduler::new(PageFetcher::new(source.clone()), store.clone());

    let summary = scheduler.run(units.clone(), 4).await;

    assert_eq!(summary.completed, 4);
    assert_eq!(
        summary.failed,
        vec![
            "BAD-USDT-SWAP/trades/2024-01-01",
            "BAD-USDT-SWAP/trades/2024-01-02",
        ]
    );
    assert!(!summary.is_success());

    // Every healthy sibling still produced its file.
    for unit in units.iter().filter(|u| u.symbol != "BAD-USDT-SWAP") {
        assert!(store.exists(unit), "missing output for {unit}");
    }
}

#[tokio::test]
async fn test_kline_run_writes_aggregated_candles() {
    let source = MockSource::new();
    let units = plan(&["BTC-USDT-SWAP"], DataKind::Klines, 1, 1);
    let start = units[0].window().start_ms;
    source.insert_trades(
        "BTC-USDT-SWAP",
        start,
        vec![
            trade(1, start + 10_000, 100, 1),
            trade(2, start + 45_000, 110, 2),
            trade(3, start + 65_000, 90, 3),
        ],
    );

    let dir = TempDir::new().unwrap();
    let store = Arc::new(CsvPartitionStore::new(dir.path()));
    let scheduler = Scheduler::new(PageFetcher::new(source), store.clone());

    let summary = scheduler.run(units.clone(), 1).await;
    assert_eq!(summary.completed, 1);

    let contents = std::fs::read_to_string(store.path_for(&units[0])).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "timestamp,open,high,low,close,volume");
    assert_eq!(lines[1], format!("{start},100,110,100,110,3"));
    assert_eq!(lines[2], format!("{},90,90,90,90,3", start + 60_000));
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_funding_run_writes_one_file_per_period() {
    let source = MockSource::new();
    let units = plan(&["BTC-USDT-SWAP"], DataKind::SwapRate, 1, 1);
    assert_eq!(units.len(), 3);
    for unit in &units {
        let start = unit.window().start_ms;
        source.insert_funding("BTC-USDT-SWAP", start, vec![funding_rate(start)]);
    }

    let dir = TempDir::new().unwrap();
    let store = Arc::new(CsvPartitionStore::new(dir.path()));
    let scheduler = Scheduler::new(PageFetcher::new(source), store.clone());

    let summary = scheduler.run(units.clone(), 2).await;
    assert_eq!(summary.completed, 3);

    for unit in &units {
        let contents = std::fs::read_to_string(store.path_for(unit)).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("contract_type,funding_rate,real_funding_rate,funding_time,timestamp")
        );
        assert!(lines.next().unwrap().starts_with("SWAP,0.0001,"));
    }
}

#[tokio::test]
async fn test_pretriggered_shutdown_dispatches_nothing() {
    let source = MockSource::new();
    let units = plan(&["BTC-USDT-SWAP"], DataKind::Trades, 1, 5);
    seed_trades(&source, &units);

    let shutdown = Shutdown::new();
    shutdown.trigger();

    let dir = TempDir::new().unwrap();
    let scheduler = Scheduler::new(
        PageFetcher::new(source.clone()),
        Arc::new(CsvPartitionStore::new(dir.path())),
    )
    .with_shutdown(shutdown);

    let summary = scheduler.run(units, 4).await;

    assert!(summary.cancelled);
    assert_eq!(summary.completed, 0);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_empty_window_writes_marker_file() {
    // No records seeded: the window legitimately has no data.
    let source = MockSource::new();
    let units = plan(&["BTC-USDT-SWAP"], DataKind::Trades, 1, 1);

    let dir = TempDir::new().unwrap();
    let store = Arc::new(CsvPartitionStore::new(dir.path()));
    let scheduler = Scheduler::new(PageFetcher::new(source), store.clone());

    let summary = scheduler.run(units.clone(), 1).await;

    assert_eq!(summary.completed, 1);
    let contents = std::fs::read_to_string(store.path_for(&units[0])).unwrap();
    assert_eq!(
        contents.trim_end(),
        "trade_id,side,size,price,created_time,timestamp"
    );
}
