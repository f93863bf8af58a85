//! Download command

use crate::downloader::config::MAX_CONCURRENCY;
use crate::downloader::{DataDumper, DumpConfig};
use crate::aggregate::GapPolicy;
use crate::{AssetClass, CandleInterval, DataKind};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use super::CliError;

/// Command-line interface for the OKX historical data downloader.
#[derive(Debug, Parser)]
#[command(name = "okx-data-downloader", version, about = "Download historical OKX market data")]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Asset class to operate on
    #[arg(long, global = true, default_value = "swap", value_parser = AssetClass::from_str)]
    pub asset_class: AssetClass,

    /// Root directory partitions are written under
    #[arg(long, global = true, default_value = "./data")]
    pub save_dir: PathBuf,

    /// Fetch units in flight at once
    #[arg(long, global = true, default_value_t = 4, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Re-fetch partitions that already exist on disk
    #[arg(long, global = true)]
    pub overwrite: bool,

    /// Attempt ceiling per page request
    #[arg(long, global = true, default_value_t = 5)]
    pub max_retries: u32,

    /// Outbound HTTP proxy URL
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Only instruments quoted in this currency (e.g. USDT)
    #[arg(long, global = true)]
    pub quote_currency: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download one data kind over a date range
    Download(DownloadArgs),
    /// List the instruments available for an asset class
    Symbols(super::symbols::SymbolsArgs),
}

/// Arguments for the download subcommand.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Data kind: trades, aggtrades, swaprate or klines
    #[arg(value_parser = DataKind::from_str)]
    pub kind: DataKind,

    /// Comma-separated symbols; every discovered instrument when omitted
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// First date to cover (YYYY-MM-DD); availability floor when omitted
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Last date to cover (YYYY-MM-DD); yesterday (UTC) when omitted
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// Candle interval for klines (1m, 5m, 15m, 1h)
    #[arg(long, default_value = "1m", value_parser = CandleInterval::from_str)]
    pub interval: CandleInterval,

    /// Omit zero-trade candle intervals instead of carrying the previous close
    #[arg(long)]
    pub omit_gaps: bool,

    /// Do not write header-only files for windows with no data
    #[arg(long)]
    pub no_empty_partitions: bool,
}

impl DownloadArgs {
    /// Build a config from the parsed arguments and run the download.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let mut builder = DumpConfig::builder(cli.asset_class)
            .symbols(self.symbols.clone())
            .save_dir(cli.save_dir.clone())
            .concurrency(cli.concurrency)
            .overwrite(cli.overwrite)
            .max_retries(cli.max_retries)
            .candle_interval(self.interval)
            .write_empty_partitions(!self.no_empty_partitions)
            .progress(true);

        if self.omit_gaps {
            builder = builder.gap_policy(GapPolicy::Omit);
        }
        if let Some(date) = self.start_date {
            builder = builder.start_date(date);
        }
        if let Some(date) = self.end_date {
            builder = builder.end_date(date);
        }
        if let Some(proxy) = &cli.proxy {
            builder = builder.proxy(proxy.clone());
        }
        if let Some(quote) = &cli.quote_currency {
            builder = builder.quote_currency(quote.clone());
        }

        let dumper = DataDumper::new(builder.build())?;
        let summary = dumper.dump(self.kind, None).await?;

        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            "download finished"
        );
        for id in &summary.failed {
            warn!(unit = %id, "unit failed");
        }
        if summary.cancelled {
            warn!("run was interrupted before all units were dispatched");
        }

        if summary.failed.is_empty() {
            Ok(())
        } else {
            Err(CliError::UnitsFailed(summary.failed.len()))
        }
    }
}

/// Parse a YYYY-MM-DD date argument.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}': {e}"))
}

/// Parse and bound a concurrency argument.
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}
