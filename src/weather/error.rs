use chrono::{DateTime, Utc};
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("API key for FMI's open data service is missing")]
    MissingApiKey,

    #[error("weather service request failed")]
    Request(#[source] reqwest::Error),

    #[error("weather service returned status {status}")]
    HttpStatus {
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse WFS response")]
    XmlParse(#[from] quick_xml::Error),

    #[error("malformed WFS feature: {0}")]
    MalformedFeature(String),

    #[error("no weather observations available between {start} and {stop}")]
    NoObservations {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },

    #[error("failed processing weather data frame")]
    Frame(#[from] PolarsError),

    #[error("grid passed for enrichment holds no rows")]
    EmptyGrid,
}
