//! Run orchestration
//!
//! [`DumpConfig`] captures one run's immutable settings, the scheduler fans
//! units out with bounded concurrency, and [`DataDumper`] wires discovery,
//! planning, fetching, aggregation and persistence together.

use crate::fetcher::FetchError;
use crate::store::StoreError;

pub mod config;
pub mod dumper;
pub mod scheduler;

pub use config::{DumpConfig, DumpConfigBuilder};
pub use dumper::DataDumper;
pub use scheduler::{RunSummary, Scheduler};

/// Top-level download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Symbol discovery or another run-level fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Partition persistence failed outside unit isolation
    #[error(transparent)]
    Store(#[from] StoreError),
}
