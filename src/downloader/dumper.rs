//! Run orchestration
//!
//! [`DataDumper`] owns one run's configuration and wires the pipeline:
//! discover symbols, plan units, then hand the plan to the scheduler with a
//! live OKX source and a CSV store.

use super::scheduler::{RunSummary, Scheduler};
use super::{DownloadError, DumpConfig};
use crate::fetcher::http::OkxHttpClient;
use crate::fetcher::{OkxRestSource, PageFetcher, RetryPolicy};
use crate::planner::plan_units;
use crate::shutdown;
use crate::store::CsvPartitionStore;
use crate::symbols::{OkxSymbolSource, SymbolInfo, SymbolSource};
use crate::{AssetClass, DataKind};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::info;

/// Downloads historical data for one asset class.
pub struct DataDumper {
    config: DumpConfig,
    http: OkxHttpClient,
}

impl DataDumper {
    /// Validate the configuration and build the HTTP client.
    pub fn new(config: DumpConfig) -> Result<Self, DownloadError> {
        config.validate().map_err(DownloadError::Config)?;
        let http = OkxHttpClient::new(config.proxy.as_deref())?;
        Ok(Self { config, http })
    }

    /// The run configuration.
    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Download one data kind over the configured (or overridden) range.
    ///
    /// Returns the run accounting; per-unit failures are collected there
    /// rather than aborting the run.
    pub async fn dump(
        &self,
        kind: DataKind,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<RunSummary, DownloadError> {
        if kind == DataKind::SwapRate && self.config.asset_class != AssetClass::Swap {
            return Err(DownloadError::Config(
                "Funding rates are only available for the swap asset class".to_string(),
            ));
        }

        let symbols = self.resolve_symbols().await?;
        let (start, end) = range.unwrap_or_else(|| self.config.effective_range());
        let units = plan_units(self.config.asset_class, &symbols, kind, start, end);
        info!(
            asset_class = %self.config.asset_class,
            %kind,
            symbols = symbols.len(),
            units = units.len(),
            start = %start,
            end = %end,
            "planned download run"
        );

        let source = Arc::new(OkxRestSource::new(self.http.clone()));
        let fetcher = PageFetcher::new(source)
            .with_retry_policy(RetryPolicy::with_max_attempts(self.config.max_retries))
            .with_page_limit(self.config.page_limit);
        let store = CsvPartitionStore::new(&self.config.save_dir)
            .with_write_empty_partitions(self.config.write_empty_partitions);

        let mut scheduler = Scheduler::new(fetcher, Arc::new(store))
            .with_overwrite(self.config.overwrite)
            .with_candles(self.config.candle_interval, self.config.gap_policy);
        if let Some(handle) = shutdown::global() {
            scheduler = scheduler.with_shutdown(handle);
        }
        if self.config.progress {
            scheduler = scheduler.with_progress(progress_bar(kind));
        }

        Ok(scheduler.run(units, self.config.concurrency).await)
    }

    /// The instruments this run covers, availability metadata included.
    pub async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, DownloadError> {
        self.resolve_symbols().await
    }

    async fn resolve_symbols(&self) -> Result<Vec<SymbolInfo>, DownloadError> {
        let listed = OkxSymbolSource::new(self.http.clone())
            .list_symbols(
                self.config.asset_class,
                self.config.quote_currency.as_deref(),
            )
            .await?;

        if self.config.symbols.is_empty() {
            return Ok(listed);
        }

        let mut resolved = Vec::with_capacity(self.config.symbols.len());
        for requested in &self.config.symbols {
            let info = listed
                .iter()
                .find(|s| &s.inst_id == requested)
                .cloned()
                .ok_or_else(|| {
                    DownloadError::Config(format!(
                        "Symbol {requested} not found for asset class {}",
                        self.config.asset_class
                    ))
                })?;
            resolved.push(info);
        }
        Ok(resolved)
    }
}

fn progress_bar(kind: DataKind) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    bar.set_message(format!("Downloading {kind}"));
    bar
}
