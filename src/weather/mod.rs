//! Weather observations from FMI's open data WFS service and their join onto
//! the city-bike grid.

mod enrich;
mod error;
mod fetch;

pub use enrich::WeatherEnricher;
pub use error::WeatherError;
pub use fetch::{FmiClient, WeatherObservation, WfsClient};
