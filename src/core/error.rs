/// Error taxonomy for the dashboard core
///
/// Only `MalformedConfiguration` is fatal. Everything else is recovered
/// locally: sources degrade to omitted sections, unknown widget kinds are
/// skipped, and store failures are logged by the sampler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("metric source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("unknown widget kind '{0}'")]
    UnknownWidgetKind(String),

    #[error("malformed configuration: {0}")]
    MalformedConfiguration(String),

    #[error("failed to write sample to store: {0}")]
    StoreWriteFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
