//! CLI error type

use crate::downloader::DownloadError;

/// Errors surfaced to the CLI user
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid command-line argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The run itself failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The run finished but some units failed
    #[error("{0} units failed")]
    UnitsFailed(usize),
}
