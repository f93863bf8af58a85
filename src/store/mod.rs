//! Partition persistence
//!
//! A partition is one symbol's records for one partition key. The store
//! exposes existence checks (the scheduler's skip signal) and atomic writes:
//! a reader never observes a partially written partition, and concurrent
//! writers to the same identity resolve to last-writer-wins.

use crate::planner::FetchUnit;
use crate::{Candle, FundingRate, Trade};
use std::path::PathBuf;

pub mod csv;
pub mod path;

pub use self::csv::CsvPartitionStore;
pub use path::partition_path;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Record serialization failed
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Records destined for one partition file, tagged by row shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionRecords {
    /// Trade rows (trades and aggtrades partitions)
    Trades(Vec<Trade>),
    /// Funding rate rows
    Funding(Vec<FundingRate>),
    /// Candle rows (klines partitions)
    Candles(Vec<Candle>),
}

impl PartitionRecords {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            PartitionRecords::Trades(t) => t.len(),
            PartitionRecords::Funding(f) => f.len(),
            PartitionRecords::Candles(c) => c.len(),
        }
    }

    /// Whether the partition has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistence seam for completed partitions.
pub trait PartitionStore: Send + Sync {
    /// Whether output for this unit already exists.
    fn exists(&self, unit: &FetchUnit) -> bool;

    /// Persist a unit's records, returning the canonical path written.
    ///
    /// An empty record set is a valid outcome; whether it produces a
    /// header-only marker file is the implementation's configuration.
    fn write(&self, unit: &FetchUnit, records: &PartitionRecords) -> StoreResult<PathBuf>;
}
