use crate::store::error::StoreError;
use crate::utils::time_bounds;
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The Parquet-backed data file holding every enriched row written so far.
///
/// The file owns all long-term state, including the watermark
/// ([`Datafile::last_date`]) the pipeline filters new source files against.
/// Appends rewrite the file through a temporary sibling and an atomic rename,
/// so a crash mid-append never damages rows that were already durable.
pub struct Datafile {
    path: PathBuf,
}

/// Basic facts about the current data file, for the `info` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatafileInfo {
    pub rows: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

impl Datafile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The timestamp of the newest row, or the floor timestamp when the file
    /// is missing or empty. The floor predates the first city-bike source
    /// files, so a fresh run fetches everything.
    pub fn last_date(&self) -> Result<DateTime<Utc>, StoreError> {
        match self.read()? {
            Some(data) => match time_bounds(&data, "date_utc")? {
                Some((_, last)) => Ok(last),
                None => Ok(floor_date()),
            },
            None => Ok(floor_date()),
        }
    }

    /// Merges `new_rows` into the file and makes them durable before
    /// returning.
    pub fn append(&mut self, new_rows: DataFrame) -> Result<(), StoreError> {
        let added = new_rows.height();
        let mut combined = match self.read()? {
            Some(existing) => existing.vstack(&new_rows)?,
            None => new_rows,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|e| StoreError::Write(self.path.clone(), e))?;
        ParquetWriter::new(tmp.as_file_mut()).finish(&mut combined)?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Write(self.path.clone(), e.error))?;

        info!(
            "wrote {} rows to {} ({} total)",
            added,
            self.path.display(),
            combined.height()
        );
        Ok(())
    }

    pub fn info(&self) -> Result<DatafileInfo, StoreError> {
        match self.read()? {
            Some(data) => {
                let bounds = time_bounds(&data, "date_utc")?;
                Ok(DatafileInfo {
                    rows: data.height(),
                    first: bounds.map(|(first, _)| first),
                    last: bounds.map(|(_, last)| last),
                })
            }
            None => Ok(DatafileInfo {
                rows: 0,
                first: None,
                last: None,
            }),
        }
    }

    fn read(&self) -> Result<Option<DataFrame>, StoreError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let file =
            File::open(&self.path).map_err(|e| StoreError::Open(self.path.clone(), e))?;
        let data = ParquetReader::new(file).finish()?;
        Ok(Some(data))
    }
}

/// 2016-01-01T00:00:00Z, before any city-bike source file was published.
fn floor_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
