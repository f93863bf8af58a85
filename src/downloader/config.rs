//! Run configuration
//!
//! One [`DumpConfig`] is built per run and never mutated afterwards; every
//! component reads its settings from here instead of process-wide state.

use crate::aggregate::GapPolicy;
use crate::fetcher::page::DEFAULT_PAGE_LIMIT;
use crate::fetcher::retry::DEFAULT_MAX_ATTEMPTS;
use crate::symbols::{normalize_symbol, AVAILABILITY_FLOOR};
use crate::{AssetClass, CandleInterval};
use chrono::{Duration, NaiveDate, Utc};
use std::path::PathBuf;

/// Default save directory.
pub const DEFAULT_SAVE_DIR: &str = "./data";

/// Default number of units in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Hard ceiling on units in flight.
pub const MAX_CONCURRENCY: usize = 32;

/// Largest page size the source serves.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Immutable settings for one download run.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Asset class being downloaded
    pub asset_class: AssetClass,
    /// Explicit symbol set; empty means every discovered instrument
    pub symbols: Vec<String>,
    /// Restrict discovery to instruments quoted in this currency
    pub quote_currency: Option<String>,
    /// First date to cover; `None` means the availability floor
    pub start_date: Option<NaiveDate>,
    /// Last date to cover; `None` means yesterday (UTC)
    pub end_date: Option<NaiveDate>,
    /// Root directory partitions are written under
    pub save_dir: PathBuf,
    /// Units in flight at once
    pub concurrency: usize,
    /// Records requested per page
    pub page_limit: usize,
    /// Re-fetch partitions that already exist on disk
    pub overwrite: bool,
    /// Write header-only files for windows with no data
    pub write_empty_partitions: bool,
    /// Candle interval for kline derivation
    pub candle_interval: CandleInterval,
    /// Policy for zero-trade candle intervals
    pub gap_policy: GapPolicy,
    /// Attempt ceiling per page request
    pub max_retries: u32,
    /// Outbound HTTP proxy URL
    pub proxy: Option<String>,
    /// Render a progress bar while the run executes
    pub progress: bool,
}

impl DumpConfig {
    /// Start building a config for an asset class.
    pub fn builder(asset_class: AssetClass) -> DumpConfigBuilder {
        DumpConfigBuilder::new(asset_class)
    }

    /// The concrete date range this run covers, defaults applied.
    pub fn effective_range(&self) -> (NaiveDate, NaiveDate) {
        let start = self.start_date.unwrap_or(AVAILABILITY_FLOOR);
        let end = self
            .end_date
            .unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));
        (start, end)
    }

    /// Validate settings that have hard bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            ));
        }

        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(format!(
                "Page limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                self.page_limit
            ));
        }

        if self.max_retries == 0 {
            return Err("Max retries must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Builder for [`DumpConfig`].
#[derive(Debug, Clone)]
pub struct DumpConfigBuilder {
    config: DumpConfig,
}

impl DumpConfigBuilder {
    fn new(asset_class: AssetClass) -> Self {
        Self {
            config: DumpConfig {
                asset_class,
                symbols: Vec::new(),
                quote_currency: None,
                start_date: None,
                end_date: None,
                save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
                concurrency: DEFAULT_CONCURRENCY,
                page_limit: DEFAULT_PAGE_LIMIT,
                overwrite: false,
                write_empty_partitions: true,
                candle_interval: CandleInterval::OneMinute,
                gap_policy: GapPolicy::default(),
                max_retries: DEFAULT_MAX_ATTEMPTS,
                proxy: None,
                progress: false,
            },
        }
    }

    /// Explicit symbol set (normalized); empty downloads every instrument.
    pub fn symbols(mut self, symbols: Vec<String>) -> Self {
        self.config.symbols = symbols.iter().map(|s| normalize_symbol(s)).collect();
        self
    }

    /// Restrict discovery to one quote currency.
    pub fn quote_currency(mut self, quote: impl Into<String>) -> Self {
        self.config.quote_currency = Some(quote.into());
        self
    }

    /// First date to cover.
    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.config.start_date = Some(date);
        self
    }

    /// Last date to cover.
    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.config.end_date = Some(date);
        self
    }

    /// Root directory partitions are written under.
    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.save_dir = dir.into();
        self
    }

    /// Units in flight at once.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Records requested per page.
    pub fn page_limit(mut self, page_limit: usize) -> Self {
        self.config.page_limit = page_limit;
        self
    }

    /// Re-fetch partitions that already exist on disk.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    /// Write header-only files for windows with no data.
    pub fn write_empty_partitions(mut self, write_empty: bool) -> Self {
        self.config.write_empty_partitions = write_empty;
        self
    }

    /// Candle interval for kline derivation.
    pub fn candle_interval(mut self, interval: CandleInterval) -> Self {
        self.config.candle_interval = interval;
        self
    }

    /// Policy for zero-trade candle intervals.
    pub fn gap_policy(mut self, policy: GapPolicy) -> Self {
        self.config.gap_policy = policy;
        self
    }

    /// Attempt ceiling per page request.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Outbound HTTP proxy URL.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Render a progress bar while the run executes.
    pub fn progress(mut self, progress: bool) -> Self {
        self.config.progress = progress;
        self
    }

    /// Finish building.
    pub fn build(self) -> DumpConfig {
        self.config
    }
}
