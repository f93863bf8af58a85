//! CSV partition store
//!
//! Writes each partition to a temporary file in the destination directory,
//! then renames it into place. The rename is the commit point: readers see
//! either the previous complete file or the new complete file, never a
//! partial one.

use super::{PartitionRecords, PartitionStore, StoreError, StoreResult};
use crate::planner::FetchUnit;
use crate::{Candle, FundingRate, Trade};
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const TRADE_HEADER: &[&str] = &["trade_id", "side", "size", "price", "created_time", "timestamp"];
const FUNDING_HEADER: &[&str] = &[
    "contract_type",
    "funding_rate",
    "real_funding_rate",
    "funding_time",
    "timestamp",
];
const CANDLE_HEADER: &[&str] = &["timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Serialize)]
struct TradeRow {
    trade_id: i64,
    side: String,
    size: String,
    price: String,
    created_time: i64,
    timestamp: String,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            side: trade.side.to_string(),
            size: trade.size.to_string(),
            price: trade.price.to_string(),
            created_time: trade.created_time,
            timestamp: rfc3339_millis(trade.created_time),
        }
    }
}

#[derive(Debug, Serialize)]
struct FundingRow {
    contract_type: String,
    funding_rate: String,
    real_funding_rate: String,
    funding_time: i64,
    timestamp: String,
}

impl From<&FundingRate> for FundingRow {
    fn from(rate: &FundingRate) -> Self {
        Self {
            contract_type: rate.contract_type.clone(),
            funding_rate: rate.funding_rate.to_string(),
            real_funding_rate: rate.real_funding_rate.to_string(),
            funding_time: rate.funding_time,
            timestamp: rfc3339_millis(rate.funding_time),
        }
    }
}

#[derive(Debug, Serialize)]
struct CandleRow {
    timestamp: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

impl From<&Candle> for CandleRow {
    fn from(candle: &Candle) -> Self {
        Self {
            timestamp: candle.timestamp,
            open: candle.open.to_string(),
            high: candle.high.to_string(),
            low: candle.low.to_string(),
            close: candle.close.to_string(),
            volume: candle.volume.to_string(),
        }
    }
}

/// Human-readable timestamp column derived from the millisecond field.
fn rfc3339_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// [`PartitionStore`] writing CSV files under a save directory.
#[derive(Debug, Clone)]
pub struct CsvPartitionStore {
    save_dir: PathBuf,
    write_empty_partitions: bool,
}

impl CsvPartitionStore {
    /// Create a store rooted at `save_dir`. Empty partitions are written as
    /// header-only marker files by default.
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            write_empty_partitions: true,
        }
    }

    /// Control whether empty record sets produce a header-only file. When
    /// disabled, an empty unit leaves no file and will be re-fetched on the
    /// next run.
    pub fn with_write_empty_partitions(mut self, write_empty: bool) -> Self {
        self.write_empty_partitions = write_empty;
        self
    }

    /// Canonical path for a unit under this store's root.
    pub fn path_for(&self, unit: &FetchUnit) -> PathBuf {
        super::partition_path(&self.save_dir, unit)
    }

    fn write_rows(&self, path: &Path, records: &PartitionRecords) -> StoreResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Io(format!("No parent directory for {}", path.display())))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Io(format!("Failed to create directory: {e}")))?;

        // Temp file lives in the destination directory so the final rename
        // stays on one filesystem.
        let tmp = NamedTempFile::new_in(parent)
            .map_err(|e| StoreError::Io(format!("Failed to create temp file: {e}")))?;

        {
            let mut writer = ::csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(BufWriter::new(tmp.as_file()));
            write_header_and_rows(&mut writer, records)?;
            writer
                .flush()
                .map_err(|e| StoreError::Io(format!("Failed to flush: {e}")))?;
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::Io(format!("Failed to sync temp file: {e}")))?;

        tmp.persist(path)
            .map_err(|e| StoreError::Io(format!("Failed to commit {}: {}", path.display(), e.error)))?;

        Ok(())
    }
}

fn write_header_and_rows<W: std::io::Write>(
    writer: &mut ::csv::Writer<W>,
    records: &PartitionRecords,
) -> StoreResult<()> {
    let csv_err = |e: ::csv::Error| StoreError::Csv(e.to_string());

    match records {
        PartitionRecords::Trades(trades) => {
            writer.write_record(TRADE_HEADER).map_err(csv_err)?;
            for trade in trades {
                writer.serialize(TradeRow::from(trade)).map_err(csv_err)?;
            }
        }
        PartitionRecords::Funding(rates) => {
            writer.write_record(FUNDING_HEADER).map_err(csv_err)?;
            for rate in rates {
                writer.serialize(FundingRow::from(rate)).map_err(csv_err)?;
            }
        }
        PartitionRecords::Candles(candles) => {
            writer.write_record(CANDLE_HEADER).map_err(csv_err)?;
            for candle in candles {
                writer.serialize(CandleRow::from(candle)).map_err(csv_err)?;
            }
        }
    }

    Ok(())
}

impl PartitionStore for CsvPartitionStore {
    fn exists(&self, unit: &FetchUnit) -> bool {
        self.path_for(unit).is_file()
    }

    fn write(&self, unit: &FetchUnit, records: &PartitionRecords) -> StoreResult<PathBuf> {
        let path = self.path_for(unit);

        if records.is_empty() && !self.write_empty_partitions {
            debug!(unit = %unit, "empty partition, not writing");
            return Ok(path);
        }

        self.write_rows(&path, records)?;
        info!(
            unit = %unit,
            rows = records.len(),
            path = %path.display(),
            "partition written"
        );
        Ok(path)
    }
}
