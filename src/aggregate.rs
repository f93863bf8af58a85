//! Trade-to-candle aggregation
//!
//! Buckets a symbol-partition's trades into fixed-interval OHLCV candles.
//! Input is pre-sorted by the fetcher; a stable re-sort here keeps the
//! function correct for callers that pass raw trades, with open/close taken
//! by creation time and source order breaking ties.

use crate::planner::TimeWindow;
use crate::{Candle, CandleInterval, Trade};
use rust_decimal::Decimal;

/// Policy for intervals inside the traded span that saw no trades.
///
/// Intervals before the first trade of the window never produce a candle
/// under either policy, since there is no previous close to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Emit a flat zero-volume candle carrying the previous close
    #[default]
    FillWithPrevClose,
    /// Emit no candle for the empty interval
    Omit,
}

/// Aggregate trades into interval-aligned candles, ascending by bucket start.
///
/// Trades outside `window` are ignored. Bucket starts are the trade
/// timestamp floored to the interval size.
pub fn aggregate_trades(
    trades: &[Trade],
    window: &TimeWindow,
    interval: CandleInterval,
    gap_policy: GapPolicy,
) -> Vec<Candle> {
    let interval_ms = interval.to_milliseconds();

    let mut in_window: Vec<&Trade> = trades
        .iter()
        .filter(|t| window.contains(t.created_time))
        .collect();
    in_window.sort_by_key(|t| t.created_time);

    let mut candles: Vec<Candle> = Vec::new();
    for trade in in_window {
        let bucket = trade.created_time.div_euclid(interval_ms) * interval_ms;
        match candles.last_mut() {
            Some(candle) if candle.timestamp == bucket => {
                candle.high = candle.high.max(trade.price);
                candle.low = candle.low.min(trade.price);
                candle.close = trade.price;
                candle.volume += trade.size;
            }
            _ => candles.push(Candle {
                timestamp: bucket,
                open: trade.price,
                high: trade.price,
                low: trade.price,
                close: trade.price,
                volume: trade.size,
            }),
        }
    }

    match gap_policy {
        GapPolicy::Omit => candles,
        GapPolicy::FillWithPrevClose => fill_gaps(candles, interval_ms),
    }
}

/// Insert flat zero-volume candles for empty intervals between the first and
/// last traded bucket. Each filled candle's OHLC is the previous close.
fn fill_gaps(candles: Vec<Candle>, interval_ms: i64) -> Vec<Candle> {
    let mut filled: Vec<Candle> = Vec::with_capacity(candles.len());

    for candle in candles {
        if let Some(prev) = filled.last() {
            let prev_close = prev.close;
            let mut expected = prev.timestamp + interval_ms;
            while expected < candle.timestamp {
                filled.push(Candle {
                    timestamp: expected,
                    open: prev_close,
                    high: prev_close,
                    low: prev_close,
                    close: prev_close,
                    volume: Decimal::ZERO,
                });
                expected += interval_ms;
            }
        }
        filled.push(candle);
    }

    filled
}
