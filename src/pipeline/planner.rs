use crate::listing::SourceFileName;
use crate::pipeline::error::PipelineError;
use chrono::{DateTime, Utc};

/// Applies the start-cutoff, result limit and batch split to a filename list.
///
/// Files with a timestamp before `first` are dropped (a file exactly at
/// `first` is kept). With `limit > 0` the remaining list is truncated to at
/// most `limit` entries. The result is split into consecutive batches of at
/// most `batch_size` files each, order preserved throughout; only the final
/// batch may be shorter.
pub fn plan_batches(
    filenames: Vec<SourceFileName>,
    first: Option<DateTime<Utc>>,
    limit: usize,
    batch_size: usize,
) -> Result<Vec<Vec<SourceFileName>>, PipelineError> {
    if batch_size == 0 {
        return Err(PipelineError::InvalidBatchSize);
    }

    let mut kept: Vec<SourceFileName> = match first {
        Some(first) => filenames
            .into_iter()
            .filter(|file| file.timestamp() >= first)
            .collect(),
        None => filenames,
    };
    if limit > 0 && kept.len() > limit {
        kept.truncate(limit);
    }

    Ok(kept
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect())
}
