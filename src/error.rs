use crate::bikes::BikeDataError;
use crate::config::ConfigError;
use crate::listing::ListingError;
use crate::pipeline::PipelineError;
use crate::store::StoreError;
use crate::weather::WeatherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillariError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error(transparent)]
    BikeData(#[from] BikeDataError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
