//! OKX response parser
//!
//! Stateless functions converting OKX REST JSON payloads into typed
//! records. Every OKX response is an envelope `{code, msg, data}` where
//! numeric fields arrive as strings.

use crate::fetcher::{FetchError, FetchResult};
use crate::{FundingRate, Trade, TradeSide};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Stateless parser for OKX API responses
pub struct OkxParser;

impl OkxParser {
    /// Unwrap the OKX response envelope and return the `data` array.
    ///
    /// A non-zero `code` is an API-level rejection of the request and is
    /// treated as fatal for the unit.
    pub fn unwrap_envelope(response: Value) -> FetchResult<Vec<Value>> {
        let code = response
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Parse("Missing response code".to_string()))?;

        if code != "0" {
            let msg = response
                .get("msg")
                .and_then(|v| v.as_str())
                .unwrap_or("<no message>");
            return Err(FetchError::Client(format!("API error {code}: {msg}")));
        }

        match response.get("data") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(_) => Err(FetchError::Parse("data is not an array".to_string())),
            None => Err(FetchError::Parse("Missing data field".to_string())),
        }
    }

    /// Parse trade rows (`tradeId`, `side`, `sz`, `px`, `ts`).
    pub fn parse_trades(rows: Vec<Value>) -> FetchResult<Vec<Trade>> {
        let mut trades = Vec::with_capacity(rows.len());

        for row in rows {
            let trade_id = Self::parse_i64_str(&row, "tradeId")?;
            let side = row
                .get("side")
                .and_then(|v| v.as_str())
                .ok_or_else(|| FetchError::Parse("Missing side".to_string()))
                .and_then(|s| {
                    TradeSide::from_str(s).map_err(FetchError::Parse)
                })?;
            let size = Self::parse_decimal(&row, "sz")?;
            let price = Self::parse_decimal(&row, "px")?;
            let created_time = Self::parse_i64_str(&row, "ts")?;

            trades.push(Trade {
                trade_id,
                side,
                size,
                price,
                created_time,
            });
        }

        Ok(trades)
    }

    /// Parse funding rate rows (`instType`, `fundingRate`, `realizedRate`,
    /// `fundingTime`).
    pub fn parse_funding_rates(rows: Vec<Value>) -> FetchResult<Vec<FundingRate>> {
        let mut rates = Vec::with_capacity(rows.len());

        for row in rows {
            let contract_type = row
                .get("instType")
                .and_then(|v| v.as_str())
                .ok_or_else(|| FetchError::Parse("Missing instType".to_string()))?
                .to_string();
            let funding_rate = Self::parse_decimal(&row, "fundingRate")?;
            let real_funding_rate = Self::parse_decimal(&row, "realizedRate")?;
            let funding_time = Self::parse_i64_str(&row, "fundingTime")?;

            rates.push(FundingRate {
                contract_type,
                funding_rate,
                real_funding_rate,
                funding_time,
            });
        }

        Ok(rates)
    }

    /// OKX encodes integers as JSON strings.
    fn parse_i64_str(row: &Value, field: &str) -> FetchResult<i64> {
        row.get(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Parse(format!("Missing {field}")))?
            .parse::<i64>()
            .map_err(|e| FetchError::Parse(format!("Failed to parse {field}: {e}")))
    }

    fn parse_decimal(row: &Value, field: &str) -> FetchResult<Decimal> {
        let s = row
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Parse(format!("Missing {field}")))?;

        Decimal::from_str(s)
            .map_err(|e| FetchError::Parse(format!("Failed to parse {field}: {e}")))
    }
}
