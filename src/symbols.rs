//! Instrument discovery
//!
//! Lists the instruments available for an asset class, with per-symbol
//! availability dates used by the planner to clamp each symbol's date range.
//! Listing sits behind [`SymbolSource`] so the planner and scheduler can be
//! tested with canned symbol sets.

use crate::fetcher::http::OkxHttpClient;
use crate::fetcher::parser::OkxParser;
use crate::fetcher::{FetchError, FetchResult};
use crate::AssetClass;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::debug;

/// Instrument metadata endpoint.
const INSTRUMENTS_ENDPOINT: &str = "/api/v5/public/instruments";

/// Earliest date any instrument's history is served from.
pub const AVAILABILITY_FLOOR: NaiveDate = match NaiveDate::from_ymd_opt(2021, 10, 1) {
    Some(d) => d,
    None => panic!("invalid availability floor"),
};

/// Metadata for one tradable instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Normalized instrument identifier (e.g. "BTC-USDT-SWAP")
    pub inst_id: String,
    /// Base currency
    pub base: String,
    /// Quote currency
    pub quote: String,
    /// First date data is available, if the listing carries one
    pub available_since: Option<NaiveDate>,
    /// Last date data is available (delisted/expired instruments)
    pub available_to: Option<NaiveDate>,
}

/// Normalize a user-supplied symbol to OKX instrument-id form.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Lists instruments for an asset class.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// List instruments, optionally restricted to one quote currency.
    async fn list_symbols(
        &self,
        asset_class: AssetClass,
        quote_currency: Option<&str>,
    ) -> FetchResult<Vec<SymbolInfo>>;
}

/// [`SymbolSource`] over the OKX instruments endpoint.
#[derive(Clone)]
pub struct OkxSymbolSource {
    http: OkxHttpClient,
}

impl OkxSymbolSource {
    /// Wrap an HTTP client.
    pub fn new(http: OkxHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SymbolSource for OkxSymbolSource {
    async fn list_symbols(
        &self,
        asset_class: AssetClass,
        quote_currency: Option<&str>,
    ) -> FetchResult<Vec<SymbolInfo>> {
        let params = [("instType", asset_class.inst_type().to_string())];
        let body = self.http.get_json(INSTRUMENTS_ENDPOINT, &params).await?;
        let rows = OkxParser::unwrap_envelope(body)?;
        let symbols = parse_instruments(rows, quote_currency)?;
        debug!(
            asset_class = %asset_class,
            count = symbols.len(),
            "listed instruments"
        );
        Ok(symbols)
    }
}

/// Parse instrument rows into [`SymbolInfo`]s.
///
/// Base and quote are taken from the instrument id's dash segments, which
/// holds for every asset class. `listTime` becomes the available-since date
/// clamped to [`AVAILABILITY_FLOOR`]; a non-empty `expTime` becomes the
/// available-to date. Rows failing the quote filter are dropped.
pub fn parse_instruments(
    rows: Vec<Value>,
    quote_currency: Option<&str>,
) -> FetchResult<Vec<SymbolInfo>> {
    let mut symbols = Vec::with_capacity(rows.len());

    for row in rows {
        let inst_id = row
            .get("instId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Parse("Missing instId".to_string()))?;
        let inst_id = normalize_symbol(inst_id);

        let mut segments = inst_id.split('-');
        let base = segments.next().unwrap_or_default().to_string();
        let quote = segments.next().unwrap_or_default().to_string();

        if let Some(wanted) = quote_currency {
            if !quote.eq_ignore_ascii_case(wanted) {
                continue;
            }
        }

        let available_since = optional_ms_date(&row, "listTime")
            .map(|d| d.max(AVAILABILITY_FLOOR))
            .or(Some(AVAILABILITY_FLOOR));
        let available_to = optional_ms_date(&row, "expTime");

        symbols.push(SymbolInfo {
            inst_id,
            base,
            quote,
            available_since,
            available_to,
        });
    }

    Ok(symbols)
}

/// Read an optional millisecond-timestamp string field as a UTC date.
/// Absent, empty or unparseable values count as absent.
fn optional_ms_date(row: &Value, field: &str) -> Option<NaiveDate> {
    let raw = row.get(field)?.as_str()?;
    let ms: i64 = raw.trim().parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}
