use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open data file '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("failed to write data file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed processing data file contents")]
    Frame(#[from] PolarsError),
}
