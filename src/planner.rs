//! Fetch-unit planning
//!
//! Expands an (asset class, symbol set, data kind, date range) request into a
//! finite ordered sequence of independently fetchable units, one per symbol
//! per partition. Trades, aggtrades and klines partition by calendar day;
//! funding rates partition by 8-hour settlement period (00:00, 08:00 and
//! 16:00 UTC).

use crate::symbols::SymbolInfo;
use crate::{AssetClass, DataKind};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Length of one funding settlement period in hours.
const FUNDING_PERIOD_HOURS: i64 = 8;

/// Half-open time window `[start_ms, end_ms)` in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Window start (inclusive), Unix milliseconds
    pub start_ms: i64,
    /// Window end (exclusive), Unix milliseconds
    pub end_ms: i64,
}

impl TimeWindow {
    /// Whether a millisecond timestamp falls inside the window.
    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms < self.end_ms
    }
}

/// Partition identity key: a calendar day or a funding settlement period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionKey {
    /// One UTC calendar day
    Day(NaiveDate),
    /// One 8-hour funding settlement period, identified by its start instant
    FundingPeriod(DateTime<Utc>),
}

impl PartitionKey {
    /// The time window covered by this partition.
    pub fn window(&self) -> TimeWindow {
        match self {
            PartitionKey::Day(date) => {
                let start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
                match start {
                    Some(start) => TimeWindow {
                        start_ms: start.timestamp_millis(),
                        end_ms: (start + Duration::days(1)).timestamp_millis(),
                    },
                    // NaiveDate::and_hms_opt(0,0,0) never fails for a valid date
                    None => TimeWindow { start_ms: 0, end_ms: 0 },
                }
            }
            PartitionKey::FundingPeriod(start) => TimeWindow {
                start_ms: start.timestamp_millis(),
                end_ms: (*start + Duration::hours(FUNDING_PERIOD_HOURS)).timestamp_millis(),
            },
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            PartitionKey::FundingPeriod(start) => {
                write!(f, "{}", start.format("%Y-%m-%dT%H"))
            }
        }
    }
}

/// One independently fetchable and storable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUnit {
    /// Asset class the symbol belongs to
    pub asset_class: AssetClass,
    /// Normalized instrument identifier (e.g. "BTC-USDT-SWAP")
    pub symbol: String,
    /// Data kind this unit fetches
    pub kind: DataKind,
    /// Partition key (calendar day or funding period)
    pub key: PartitionKey,
}

impl FetchUnit {
    /// Stable unit identity used in summaries and logs.
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.symbol, self.kind, self.key)
    }

    /// The time window this unit must cover.
    pub fn window(&self) -> TimeWindow {
        self.key.window()
    }
}

impl std::fmt::Display for FetchUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Expand a request into an ordered unit sequence.
///
/// Units are ordered symbol-major, then chronologically, so plans are
/// deterministic for a given input. A range with `start > end` yields an
/// empty plan. Each symbol's units are clamped to its availability range
/// when the symbol metadata carries one.
pub fn plan_units(
    asset_class: AssetClass,
    symbols: &[SymbolInfo],
    kind: DataKind,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<FetchUnit> {
    let mut units = Vec::new();

    for symbol in symbols {
        let sym_start = match symbol.available_since {
            Some(since) if since > start => since,
            _ => start,
        };
        let sym_end = match symbol.available_to {
            Some(to) if to < end => to,
            _ => end,
        };

        let mut date = sym_start;
        while date <= sym_end {
            if kind.is_daily() {
                units.push(FetchUnit {
                    asset_class,
                    symbol: symbol.inst_id.clone(),
                    kind,
                    key: PartitionKey::Day(date),
                });
            } else {
                for hour in (0..24).step_by(FUNDING_PERIOD_HOURS as usize) {
                    let period_start = date
                        .and_hms_opt(hour, 0, 0)
                        .map(|dt| dt.and_utc())
                        .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap());
                    units.push(FetchUnit {
                        asset_class,
                        symbol: symbol.inst_id.clone(),
                        kind,
                        key: PartitionKey::FundingPeriod(period_start),
                    });
                }
            }
            date += Duration::days(1);
        }
    }

    units
}
