//! CLI entry point

use clap::Parser;
use okx_data_downloader::cli::{Cli, Commands};
use okx_data_downloader::shutdown::{self, Shutdown};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber, optionally in JSON format.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("okx_data_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Download(args) => args.execute(cli).await?,
        Commands::Symbols(args) => args.execute(cli).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Ctrl+C stops dispatching new units; in-flight units finish cleanly.
    let handle = Shutdown::new();
    shutdown::register_global(handle.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received - finishing in-flight partitions");
            handle.trigger();
        }
    });

    if let Err(e) = run(&cli).await {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }
}
