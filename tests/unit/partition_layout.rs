//! Output layout for planned units.

use chrono::NaiveDate;
use okx_data_downloader::planner::plan_units;
use okx_data_downloader::store::CsvPartitionStore;
use okx_data_downloader::symbols::SymbolInfo;
use okx_data_downloader::{AssetClass, DataKind};
use std::path::Path;

fn symbol(inst_id: &str) -> SymbolInfo {
    SymbolInfo {
        inst_id: inst_id.to_string(),
        base: "BTC".to_string(),
        quote: "USDT".to_string(),
        available_since: None,
        available_to: None,
    }
}

#[test]
fn test_daily_units_map_to_per_day_files() {
    let store = CsvPartitionStore::new("/data");
    let units = plan_units(
        AssetClass::Swap,
        &[symbol("BTC-USDT-SWAP")],
        DataKind::AggTrades,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
    );

    let paths: Vec<_> = units.iter().map(|u| store.path_for(u)).collect();
    assert_eq!(
        paths[0],
        Path::new("/data/swap/aggtrades/2024-01-01/BTC-USDT-SWAP-aggtrades-2024-01-01.csv")
    );
    assert_eq!(
        paths[1],
        Path::new("/data/swap/aggtrades/2024-01-02/BTC-USDT-SWAP-aggtrades-2024-01-02.csv")
    );
}

#[test]
fn test_funding_units_map_to_per_period_files() {
    let store = CsvPartitionStore::new("/data");
    let units = plan_units(
        AssetClass::Swap,
        &[symbol("BTC-USDT-SWAP")],
        DataKind::SwapRate,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    );

    assert_eq!(units.len(), 3);
    let paths: Vec<String> = units
        .iter()
        .map(|u| store.path_for(u).to_string_lossy().into_owned())
        .collect();
    assert!(paths[0].ends_with("swaprate/2024-01-01T00/BTC-USDT-SWAP-swaprate-2024-01-01T00.csv"));
    assert!(paths[1].ends_with("swaprate/2024-01-01T08/BTC-USDT-SWAP-swaprate-2024-01-01T08.csv"));
    assert!(paths[2].ends_with("swaprate/2024-01-01T16/BTC-USDT-SWAP-swaprate-2024-01-01T16.csv"));
}

#[test]
fn test_asset_classes_are_separated() {
    let store = CsvPartitionStore::new("/data");
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for (class, segment) in [
        (AssetClass::Spot, "/data/spot/"),
        (AssetClass::Swap, "/data/swap/"),
        (AssetClass::Future, "/data/future/"),
    ] {
        let units = plan_units(class, &[symbol("BTC-USDT")], DataKind::Trades, date, date);
        let path = store.path_for(&units[0]);
        assert!(path.to_string_lossy().starts_with(segment));
    }
}
