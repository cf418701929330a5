//! Builds and maintains the Fillariennustin dataset: a per-minute table of
//! Helsinki city-bike station availability joined with weather observations
//! from FMI's (Finnish Meteorological Institute) open data service.
//!
//! The update pipeline discovers source files newer than the data file's last
//! entry, processes them in bounded batches, expands each batch to a dense
//! minute-by-station grid and attaches the nearest weather observation to
//! every row before appending the batch to the data file.

mod bikes;
mod config;
mod error;
mod listing;
mod pipeline;
mod store;
mod utils;
mod weather;

pub use error::FillariError;

pub use bikes::{complete_grid, BikeDataError, FileFailure, LoadReport, StationDataLoader};
pub use config::{Config, ConfigError};
pub use listing::{ListingError, Source, SourceFileName, SourceLister};
pub use pipeline::{
    plan_batches, PipelineError, UpdateOptions, UpdatePipeline, UpdateSummary,
};
pub use store::{Datafile, DatafileInfo, StoreError};
pub use weather::{
    FmiClient, WeatherEnricher, WeatherError, WeatherObservation, WfsClient,
};
