//! Fetching and normalizing city-bike availability payloads, and expansion of
//! a batch to the dense minute-by-station grid.

mod error;
mod grid;
mod loader;

pub use error::BikeDataError;
pub use grid::complete_grid;
pub use loader::{FileFailure, LoadReport, StationDataLoader};
