use crate::bikes::{complete_grid, StationDataLoader};
use crate::error::FillariError;
use crate::listing::{Source, SourceLister};
use crate::pipeline::planner::plan_batches;
use crate::store::Datafile;
use crate::weather::{WeatherEnricher, WfsClient};
use bon::Builder;
use chrono::{DateTime, Utc};
use log::{info, warn};

/// Options applied to one update run.
#[derive(Debug, Clone, Builder)]
pub struct UpdateOptions {
    /// Earliest source-file timestamp to include, regardless of the
    /// watermark.
    pub first: Option<DateTime<Utc>>,
    /// Maximum number of source files to process; 0 means no limit.
    #[builder(default = 0)]
    pub limit: usize,
    /// Files per batch. Each batch is enriched and persisted before the next
    /// one is loaded, which bounds peak memory use.
    #[builder(default = 500)]
    pub batch_size: usize,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What an update run accomplished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    pub batches: usize,
    pub rows_appended: usize,
    pub files_failed: usize,
}

impl UpdateSummary {
    /// True when the run found nothing to do.
    pub fn is_empty(&self) -> bool {
        self.batches == 0 && self.rows_appended == 0
    }
}

/// The incremental update pipeline.
///
/// Lists source files newer than the data file's last entry, plans them into
/// batches, and per batch loads the station data, completes the minute grid,
/// joins weather observations on and appends the result to the data file.
/// Batches are processed strictly in order; if one fails, everything appended
/// before it stays durably saved and the run stops.
pub struct UpdatePipeline {
    lister: SourceLister,
    loader: StationDataLoader,
    enricher: WeatherEnricher,
}

impl UpdatePipeline {
    pub fn new() -> Self {
        Self {
            lister: SourceLister::new(),
            loader: StationDataLoader::new(),
            enricher: WeatherEnricher::new(),
        }
    }

    pub async fn run<W: WfsClient>(
        &self,
        source: &Source,
        datafile: &mut Datafile,
        weather: &W,
        options: &UpdateOptions,
    ) -> Result<UpdateSummary, FillariError> {
        let after = datafile.last_date()?;
        info!("updating with data after {}", after);

        let filenames = self.lister.list_new(source, after).await?;
        if filenames.is_empty() {
            info!("no new files found");
            return Ok(UpdateSummary::default());
        }

        let batches = plan_batches(filenames, options.first, options.limit, options.batch_size)?;
        let mut summary = UpdateSummary::default();

        for (index, batch) in batches.iter().enumerate() {
            info!("processing batch {} of {}", index + 1, batches.len());

            let (data, report) = self.loader.load(source, batch).await?;
            summary.files_failed += report.failures.len();
            if data.height() == 0 {
                warn!("batch {} produced no rows, skipping", index + 1);
                continue;
            }

            let grid = complete_grid(&data)?;
            let enriched = self.enricher.enrich(grid, weather).await?;

            let rows = enriched.height();
            datafile.append(enriched)?;
            summary.rows_appended += rows;
            summary.batches += 1;
            info!("appended {} rows", rows);
        }

        Ok(summary)
    }
}

impl Default for UpdatePipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::{WeatherError, WeatherObservation};
    use chrono::{Duration, TimeZone};
    use std::fs;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, h, mi, 0).unwrap()
    }

    struct FakeWfs;

    impl WfsClient for FakeWfs {
        async fn fetch_range(
            &self,
            start: DateTime<Utc>,
            stop: DateTime<Utc>,
        ) -> Result<Vec<WeatherObservation>, WeatherError> {
            // One observation per 10 minutes across the requested range.
            let mut rows = Vec::new();
            let mut t = utc(0, 0);
            while t <= stop {
                if t >= start {
                    rows.push(WeatherObservation {
                        time: t,
                        temperature: -2.0,
                        wind_speed: 4.0,
                        pressure_sea: 1013.0,
                        rain_1h: Some(0.0),
                    });
                }
                t += Duration::minutes(10);
            }
            Ok(rows)
        }
    }

    fn payload(bikes: i64) -> String {
        format!(
            r#"{{"result": [
                {{"name": "001 Kaivopuisto", "coordinates": "60.155411,24.950391",
                  "style": "", "avl_bikes": {bikes}, "free_slots": 8,
                  "total_slots": 12, "operative": true}},
                {{"name": "002 Laivasillankatu", "coordinates": "60.160989,24.955549",
                  "style": "", "avl_bikes": 2, "free_slots": 10,
                  "total_slots": 12, "operative": true}}
            ]}}"#
        )
    }

    fn write_source(dir: &std::path::Path) {
        for (i, name) in [
            "stations_20200101T000000Z",
            "stations_20200101T000100Z",
            "stations_20200101T000200Z",
            "stations_20200101T000300Z",
        ]
        .iter()
        .enumerate()
        {
            fs::write(dir.join(name), payload(i as i64)).unwrap();
        }
    }

    #[tokio::test]
    async fn runs_end_to_end_over_a_local_source() {
        let source_dir = tempfile::tempdir().unwrap();
        write_source(source_dir.path());
        let data_dir = tempfile::tempdir().unwrap();
        let mut datafile = Datafile::new(data_dir.path().join("data.parquet"));

        let source = Source::Dir(source_dir.path().to_path_buf());
        let pipeline = UpdatePipeline::new();
        let options = UpdateOptions::builder().batch_size(2).build();

        let summary = pipeline
            .run(&source, &mut datafile, &FakeWfs, &options)
            .await
            .unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.files_failed, 0);
        // Batch 1: minutes 0-1, batch 2: minutes 2-3, two stations each.
        assert_eq!(summary.rows_appended, 8);

        let info = datafile.info().unwrap();
        assert_eq!(info.rows, 8);
        assert_eq!(info.first, Some(utc(0, 0)));
        assert_eq!(info.last, Some(utc(0, 3)));
    }

    #[tokio::test]
    async fn second_run_with_nothing_new_appends_nothing() {
        let source_dir = tempfile::tempdir().unwrap();
        write_source(source_dir.path());
        let data_dir = tempfile::tempdir().unwrap();
        let mut datafile = Datafile::new(data_dir.path().join("data.parquet"));

        let source = Source::Dir(source_dir.path().to_path_buf());
        let pipeline = UpdatePipeline::new();
        let options = UpdateOptions::default();

        let first = pipeline
            .run(&source, &mut datafile, &FakeWfs, &options)
            .await
            .unwrap();
        assert!(!first.is_empty());
        let rows_after_first = datafile.info().unwrap().rows;

        let second = pipeline
            .run(&source, &mut datafile, &FakeWfs, &options)
            .await
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(datafile.info().unwrap().rows, rows_after_first);
    }

    #[tokio::test]
    async fn limit_and_first_are_honored() {
        let source_dir = tempfile::tempdir().unwrap();
        write_source(source_dir.path());
        let data_dir = tempfile::tempdir().unwrap();
        let mut datafile = Datafile::new(data_dir.path().join("data.parquet"));

        let source = Source::Dir(source_dir.path().to_path_buf());
        let pipeline = UpdatePipeline::new();
        let options = UpdateOptions::builder()
            .first(utc(0, 1))
            .limit(2)
            .batch_size(10)
            .build();

        let summary = pipeline
            .run(&source, &mut datafile, &FakeWfs, &options)
            .await
            .unwrap();

        // Files at minutes 1 and 2 survive the cutoff and limit.
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.rows_appended, 4);
        let info = datafile.info().unwrap();
        assert_eq!(info.first, Some(utc(0, 1)));
        assert_eq!(info.last, Some(utc(0, 2)));
    }

    #[tokio::test]
    async fn malformed_file_is_reported_but_does_not_stop_the_run() {
        let source_dir = tempfile::tempdir().unwrap();
        write_source(source_dir.path());
        fs::write(
            source_dir.path().join("stations_20200101T000400Z"),
            "{broken",
        )
        .unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let mut datafile = Datafile::new(data_dir.path().join("data.parquet"));

        let source = Source::Dir(source_dir.path().to_path_buf());
        let pipeline = UpdatePipeline::new();
        let options = UpdateOptions::default();

        let summary = pipeline
            .run(&source, &mut datafile, &FakeWfs, &options)
            .await
            .unwrap();

        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.batches, 1);
        // The four intact files still cover minutes 0-3.
        assert_eq!(datafile.info().unwrap().rows, 8);
    }
}
