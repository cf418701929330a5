//! Batch planning and the incremental update pipeline.

mod error;
mod planner;
mod update;

pub use error::PipelineError;
pub use planner::plan_batches;
pub use update::{UpdateOptions, UpdatePipeline, UpdateSummary};
