//! The persistent data file all enriched batches are appended to.

mod datafile;
mod error;

pub use datafile::{Datafile, DatafileInfo};
pub use error::StoreError;
