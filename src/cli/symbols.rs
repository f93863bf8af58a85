//! Symbols command

use super::download::Cli;
use super::CliError;
use crate::downloader::{DataDumper, DumpConfig};
use clap::Args;

/// Arguments for the symbols subcommand.
#[derive(Debug, Args)]
pub struct SymbolsArgs {
    /// Print availability dates alongside each instrument
    #[arg(long)]
    pub detailed: bool,
}

impl SymbolsArgs {
    /// List the instruments for the selected asset class.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let mut builder = DumpConfig::builder(cli.asset_class);
        if let Some(proxy) = &cli.proxy {
            builder = builder.proxy(proxy.clone());
        }
        if let Some(quote) = &cli.quote_currency {
            builder = builder.quote_currency(quote.clone());
        }

        let dumper = DataDumper::new(builder.build())?;
        let symbols = dumper.list_symbols().await?;

        for symbol in &symbols {
            if self.detailed {
                let since = symbol
                    .available_since
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let to = symbol
                    .available_to
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", symbol.inst_id, since, to);
            } else {
                println!("{}", symbol.inst_id);
            }
        }
        eprintln!("{} instruments", symbols.len());

        Ok(())
    }
}
