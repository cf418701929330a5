use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}
