//! # OKX Data Downloader Library
//!
//! A library for downloading historical OKX market data (trade-by-trade,
//! aggregated trades, and funding rates) over arbitrary date ranges and
//! deriving fixed-interval candlestick data from trades.
//!
//! ## Features
//!
//! - **Partitioned downloads**: one file per symbol per day (or per funding
//!   settlement period), laid out under a predictable directory tree
//! - **Bounded concurrency**: many partitions in flight at once, limited by
//!   a configurable concurrency cap
//! - **Idempotent**: partitions already on disk are skipped unless an
//!   overwrite is requested, so interrupted runs can simply be re-run
//! - **Retry with backoff**: transient network failures and rate limits are
//!   retried per page with exponential backoff and jitter
//! - **Kline derivation**: 1-minute (or any fixed-interval) OHLCV candles
//!   aggregated from aggregated-trade records
//!
//! ## Quick Start
//!
//! ```no_run
//! use okx_data_downloader::downloader::{DataDumper, DumpConfig};
//! use okx_data_downloader::{AssetClass, DataKind};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DumpConfig::builder(AssetClass::Swap)
//!     .symbols(vec!["BTC-USDT-SWAP".to_string(), "ETH-USDT-SWAP".to_string()])
//!     .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
//!     .end_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
//!     .save_dir("./data")
//!     .build();
//!
//! let dumper = DataDumper::new(config)?;
//! let summary = dumper.dump(DataKind::Trades, None).await?;
//! println!("{} completed, {} skipped, {} failed",
//!     summary.completed, summary.skipped, summary.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`planner`] - Expands a request into independent per-partition fetch units
//! - [`fetcher`] - Paginated page fetching with retry and error classification
//! - [`aggregate`] - Trade-to-candle OHLCV aggregation
//! - [`store`] - Atomic partition persistence and existence checks
//! - [`downloader`] - Concurrency scheduling and run orchestration
//! - [`symbols`] - Instrument discovery and name normalization
//!
//! ## Data Types
//!
//! - [`Trade`] - One trade (or aggregated trade) observation
//! - [`FundingRate`] - One perpetual-swap funding settlement
//! - [`Candle`] - Fixed-interval OHLCV summary derived from trades

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Trade-to-candle aggregation
pub mod aggregate;

/// CLI command implementations
pub mod cli;

/// Run orchestration and concurrency scheduling
pub mod downloader;

/// Paginated page fetching
pub mod fetcher;

/// Fetch-unit planning
pub mod planner;

/// Partition persistence
pub mod store;

/// Instrument discovery and normalization
pub mod symbols;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use downloader::{DataDumper, DumpConfig};
pub use planner::{FetchUnit, PartitionKey};

/// Asset class of the instruments being downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Spot markets
    #[serde(rename = "spot")]
    Spot,
    /// Perpetual swaps
    #[serde(rename = "swap")]
    Swap,
    /// Dated futures
    #[serde(rename = "future")]
    Future,
}

impl AssetClass {
    /// OKX instrument-type parameter for this asset class
    pub fn inst_type(&self) -> &'static str {
        match self {
            AssetClass::Spot => "SPOT",
            AssetClass::Swap => "SWAP",
            AssetClass::Future => "FUTURES",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssetClass::Spot => "spot",
            AssetClass::Swap => "swap",
            AssetClass::Future => "future",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(AssetClass::Spot),
            "swap" => Ok(AssetClass::Swap),
            "future" | "futures" => Ok(AssetClass::Future),
            _ => Err(format!("Invalid asset class: {s}")),
        }
    }
}

/// Kind of data being downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Trade-by-trade records
    #[serde(rename = "trades")]
    Trades,
    /// Aggregated trade records
    #[serde(rename = "aggtrades")]
    AggTrades,
    /// Funding rate settlements (perpetual swaps only)
    #[serde(rename = "swaprate")]
    SwapRate,
    /// Candles derived from aggregated trades
    #[serde(rename = "klines")]
    Klines,
}

impl DataKind {
    /// Whether partitions of this kind cover a calendar day (as opposed to
    /// a funding settlement period).
    pub fn is_daily(&self) -> bool {
        !matches!(self, DataKind::SwapRate)
    }

    /// Whether records of this kind are trade-shaped.
    pub fn is_trade_like(&self) -> bool {
        matches!(
            self,
            DataKind::Trades | DataKind::AggTrades | DataKind::Klines
        )
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataKind::Trades => "trades",
            DataKind::AggTrades => "aggtrades",
            DataKind::SwapRate => "swaprate",
            DataKind::Klines => "klines",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trades" => Ok(DataKind::Trades),
            "aggtrades" => Ok(DataKind::AggTrades),
            "swaprate" => Ok(DataKind::SwapRate),
            "klines" => Ok(DataKind::Klines),
            _ => Err(format!("Invalid data kind: {s}")),
        }
    }
}

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    /// Taker bought
    #[serde(rename = "buy")]
    Buy,
    /// Taker sold
    #[serde(rename = "sell")]
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err(format!("Invalid trade side: {s}")),
        }
    }
}

/// One trade (or aggregated trade) observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Trade identifier, unique within a symbol
    pub trade_id: i64,
    /// Trade side
    pub side: TradeSide,
    /// Trade size in base units
    pub size: Decimal,
    /// Trade price
    pub price: Decimal,
    /// Creation time (Unix timestamp in milliseconds)
    pub created_time: i64,
}

impl Trade {
    /// Creation time as a UTC instant.
    ///
    /// Returns `None` for timestamps outside chrono's representable range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_time).single()
    }

    /// Validate trade data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.price <= Decimal::ZERO {
            return Err(format!("Price must be positive, got {}", self.price));
        }

        if self.size <= Decimal::ZERO {
            return Err(format!("Size must be positive, got {}", self.size));
        }

        if self.created_time <= 0 {
            return Err(format!(
                "Created time must be positive, got {}",
                self.created_time
            ));
        }

        Ok(())
    }
}

/// One funding rate settlement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundingRate {
    /// Contract type reported by the source (e.g. "SWAP")
    pub contract_type: String,
    /// Funding rate (signed decimal)
    pub funding_rate: Decimal,
    /// Realized funding rate (signed decimal)
    pub real_funding_rate: Decimal,
    /// Funding time (Unix timestamp in milliseconds)
    pub funding_time: i64,
}

impl FundingRate {
    /// Funding time as a UTC instant.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.funding_time).single()
    }

    /// Validate funding rate data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.contract_type.is_empty() {
            return Err("Contract type cannot be empty".to_string());
        }

        if self.funding_time <= 0 {
            return Err(format!(
                "Funding time must be positive, got {}",
                self.funding_time
            ));
        }

        Ok(())
    }
}

/// Fixed-interval OHLCV candle derived from trades
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Interval start (Unix timestamp in milliseconds)
    pub timestamp: i64,
    /// Price of the earliest trade in the interval
    pub open: Decimal,
    /// Highest trade price in the interval
    pub high: Decimal,
    /// Lowest trade price in the interval
    pub low: Decimal,
    /// Price of the latest trade in the interval
    pub close: Decimal,
    /// Sum of trade sizes in the interval
    pub volume: Decimal,
}

impl Candle {
    /// Validate candle data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.high < self.open || self.high < self.close {
            return Err(format!(
                "High ({}) must be >= open ({}) and close ({})",
                self.high, self.open, self.close
            ));
        }

        if self.low > self.open || self.low > self.close {
            return Err(format!(
                "Low ({}) must be <= open ({}) and close ({})",
                self.low, self.open, self.close
            ));
        }

        if self.volume < Decimal::ZERO {
            return Err(format!("Volume must be non-negative, got {}", self.volume));
        }

        Ok(())
    }
}

/// Fixed candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    /// 1 minute
    #[serde(rename = "1m")]
    OneMinute,
    /// 5 minutes
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 15 minutes
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// 1 hour
    #[serde(rename = "1h")]
    OneHour,
}

impl CandleInterval {
    /// Interval length in milliseconds
    pub fn to_milliseconds(&self) -> i64 {
        match self {
            CandleInterval::OneMinute => 60_000,
            CandleInterval::FiveMinutes => 300_000,
            CandleInterval::FifteenMinutes => 900_000,
            CandleInterval::OneHour => 3_600_000,
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::FifteenMinutes => "15m",
            CandleInterval::OneHour => "1h",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CandleInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(CandleInterval::OneMinute),
            "5m" => Ok(CandleInterval::FiveMinutes),
            "15m" => Ok(CandleInterval::FifteenMinutes),
            "1h" => Ok(CandleInterval::OneHour),
            _ => Err(format!("Invalid candle interval: {s}")),
        }
    }
}
