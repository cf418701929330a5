//! Discovery of city-bike source files from an HTTP directory listing or a
//! local folder.

mod error;
mod filename;
mod lister;

pub use error::ListingError;
pub use filename::SourceFileName;
pub use lister::{Source, SourceLister};

pub(crate) use lister::FileLocation;
