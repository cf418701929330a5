use crate::bikes::error::BikeDataError;
use crate::listing::{Source, SourceFileName};
use chrono::NaiveDateTime;
use log::warn;
use polars::prelude::*;
use serde::Deserialize;

/// One file's payload: `{"result": [ {...station fields...}, ... ]}`.
#[derive(Debug, Deserialize)]
struct StationPayload {
    result: Vec<StationStatus>,
}

/// Availability of one station at one point in time, as published by HSL.
#[derive(Debug, Deserialize)]
struct StationStatus {
    name: String,
    #[serde(default)]
    operative: Option<bool>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    coordinates: Option<String>,
    #[serde(default)]
    total_slots: Option<i64>,
    #[serde(default)]
    free_slots: Option<i64>,
    #[serde(default)]
    avl_bikes: Option<i64>,
}

/// A file that could not be turned into rows, with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub filename: String,
    pub reason: String,
}

/// What happened while loading one batch: how many files produced rows and
/// which ones did not. Failures never abort the batch.
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    pub files_loaded: usize,
    pub failures: Vec<FileFailure>,
}

/// Fetches the files of one batch and merges them into a single table with
/// one row per (timestamp, station name) pair.
pub struct StationDataLoader {
    http: reqwest::Client,
}

impl StationDataLoader {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Loads every file in `batch` from `source`, in batch order.
    ///
    /// Each row is stamped with the file's embedded timestamp truncated to
    /// the minute. Files that cannot be fetched or parsed are recorded in the
    /// report and skipped; the returned table holds the rows of every file
    /// that succeeded, and is empty when none did.
    pub async fn load(
        &self,
        source: &Source,
        batch: &[SourceFileName],
    ) -> Result<(DataFrame, LoadReport), BikeDataError> {
        let mut frames = Vec::new();
        let mut report = LoadReport::default();

        for file in batch {
            match self.load_one(source, file).await {
                Ok(frame) => {
                    report.files_loaded += 1;
                    frames.push(frame);
                }
                Err(reason) => {
                    warn!("skipping '{}': {}", file.name(), reason);
                    report.failures.push(FileFailure {
                        filename: file.name().to_string(),
                        reason,
                    });
                }
            }
        }
        if !report.failures.is_empty() {
            warn!(
                "data for {} of {} files could not be processed",
                report.failures.len(),
                batch.len()
            );
        }

        let mut frames = frames.into_iter();
        let Some(mut data) = frames.next() else {
            return Ok((DataFrame::empty(), report));
        };
        for frame in frames {
            data.vstack_mut(&frame)?;
        }
        Ok((data, report))
    }

    /// Fetches and parses a single file. The error is a human-readable reason
    /// for the batch report, not a typed failure; whatever goes wrong here is
    /// recoverable by skipping the file.
    async fn load_one(
        &self,
        source: &Source,
        file: &SourceFileName,
    ) -> Result<DataFrame, String> {
        let bytes = self.fetch(source, file).await?;
        let payload: StationPayload =
            serde_json::from_slice(&bytes).map_err(|e| format!("malformed payload: {e}"))?;
        frame_from_statuses(payload.result, file.minute().naive_utc())
            .map_err(|e| format!("failed to build frame: {e}"))
    }

    async fn fetch(&self, source: &Source, file: &SourceFileName) -> Result<Vec<u8>, String> {
        use crate::listing::FileLocation;
        match source.resolve(file.name()).map_err(|e| e.to_string())? {
            FileLocation::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| format!("fetch failed: {e}"))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| format!("fetch failed: {e}"))?;
                Ok(bytes.to_vec())
            }
            FileLocation::Path(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| format!("read failed for {}: {e}", path.display())),
        }
    }
}

impl Default for StationDataLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn frame_from_statuses(
    statuses: Vec<StationStatus>,
    stamp: NaiveDateTime,
) -> PolarsResult<DataFrame> {
    let n = statuses.len();
    let mut name = Vec::with_capacity(n);
    let mut operative = Vec::with_capacity(n);
    let mut style = Vec::with_capacity(n);
    let mut coordinates = Vec::with_capacity(n);
    let mut total_slots = Vec::with_capacity(n);
    let mut free_slots = Vec::with_capacity(n);
    let mut avl_bikes = Vec::with_capacity(n);
    for status in statuses {
        name.push(status.name);
        operative.push(status.operative);
        style.push(status.style);
        coordinates.push(status.coordinates);
        total_slots.push(status.total_slots);
        free_slots.push(status.free_slots);
        avl_bikes.push(status.avl_bikes);
    }
    df!(
        "date_utc" => vec![stamp; n],
        "name" => name,
        "operative" => operative,
        "style" => style,
        "coordinates" => coordinates,
        "total_slots" => total_slots,
        "free_slots" => free_slots,
        "avl_bikes" => avl_bikes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::fs;

    const PAYLOAD_A: &str = r#"{"result": [
        {"name": "001 Kaivopuisto", "coordinates": "60.155411,24.950391", "style": "",
         "avl_bikes": 4, "free_slots": 8, "total_slots": 12, "operative": true},
        {"name": "002 Laivasillankatu", "coordinates": "60.160989,24.955549", "style": "",
         "avl_bikes": 11, "free_slots": 1, "total_slots": 12, "operative": true}
    ]}"#;
    const PAYLOAD_B: &str = r#"{"result": [
        {"name": "001 Kaivopuisto", "coordinates": "60.155411,24.950391", "style": "",
         "avl_bikes": 3, "free_slots": 9, "total_slots": 12, "operative": true}
    ]}"#;

    fn batch(names: &[&str]) -> Vec<SourceFileName> {
        names
            .iter()
            .map(|n| SourceFileName::parse(n).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn loads_batch_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stations_20200101T000030Z"), PAYLOAD_A).unwrap();
        fs::write(dir.path().join("stations_20200101T000130Z"), PAYLOAD_B).unwrap();
        let source = Source::Dir(dir.path().to_path_buf());
        let loader = StationDataLoader::new();

        let (data, report) = loader
            .load(
                &source,
                &batch(&["stations_20200101T000030Z", "stations_20200101T000130Z"]),
            )
            .await
            .unwrap();

        assert_eq!(report.files_loaded, 2);
        assert!(report.failures.is_empty());
        assert_eq!(data.height(), 3);

        // Stamps come from the filenames, seconds truncated.
        let stamps = data
            .column("date_utc")
            .unwrap()
            .as_materialized_series()
            .datetime()
            .unwrap();
        let first = crate::utils::from_timestamp(stamps.get(0).unwrap(), stamps.time_unit());
        assert_eq!(
            first,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
        let last = crate::utils::from_timestamp(stamps.get(2).unwrap(), stamps.time_unit());
        assert_eq!(
            last,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 1, 0).unwrap())
        );

        let bikes = data
            .column("avl_bikes")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap();
        assert_eq!(bikes.get(0), Some(4));
        assert_eq!(bikes.get(2), Some(3));
    }

    #[tokio::test]
    async fn malformed_file_is_counted_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stations_20200101T000000Z"), PAYLOAD_A).unwrap();
        fs::write(dir.path().join("stations_20200101T000100Z"), "{not json").unwrap();
        fs::write(dir.path().join("stations_20200101T000200Z"), PAYLOAD_B).unwrap();
        let source = Source::Dir(dir.path().to_path_buf());
        let loader = StationDataLoader::new();

        let (data, report) = loader
            .load(
                &source,
                &batch(&[
                    "stations_20200101T000000Z",
                    "stations_20200101T000100Z",
                    "stations_20200101T000200Z",
                ]),
            )
            .await
            .unwrap();

        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].filename, "stations_20200101T000100Z");
        assert_eq!(data.height(), 3);
    }

    #[tokio::test]
    async fn all_files_failing_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::Dir(dir.path().to_path_buf());
        let loader = StationDataLoader::new();

        let (data, report) = loader
            .load(&source, &batch(&["stations_20200101T000000Z"]))
            .await
            .unwrap();
        assert_eq!(data.height(), 0);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn missing_optional_fields_become_nulls() {
        let payload: StationPayload =
            serde_json::from_str(r#"{"result": [{"name": "001 Kaivopuisto"}]}"#).unwrap();
        let stamp = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .unwrap()
            .naive_utc();
        let frame = frame_from_statuses(payload.result, stamp).unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.column("avl_bikes").unwrap().null_count(), 1);
        assert_eq!(frame.column("operative").unwrap().null_count(), 1);
    }
}
