use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BikeDataError {
    #[error("failed processing station data frame")]
    Frame(#[from] PolarsError),
}
