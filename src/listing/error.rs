use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("source '{0}' is neither an HTTP address nor a local directory")]
    InvalidSource(String),

    #[error("listing request failed for {0}")]
    ListingRequest(String, #[source] reqwest::Error),

    #[error("listing request for {url} returned status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read source directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("no filenames matching the expected pattern found ({tested} names tested)")]
    NoMatchingFilenames { tested: usize },

    #[error("failed to resolve the URL for source file '{0}'")]
    FileUrl(String, #[source] url::ParseError),
}
