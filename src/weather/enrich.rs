use crate::utils::{minute_range, time_bounds};
use crate::weather::error::WeatherError;
use crate::weather::fetch::{WeatherObservation, WfsClient};
use chrono::{DateTime, Duration, Utc};
use log::warn;
use polars::prelude::*;
use std::collections::HashSet;

/// Joins the nearest weather observation onto every row of a grid.
///
/// Observations are fetched in bounded sub-ranges because the FMI service
/// tends to time out on long intervals; one day has proven robust. A failed
/// sub-range contributes no rows and the rest still cover the grid through
/// the nearest-time match, so per-range failures are logged and absorbed.
pub struct WeatherEnricher {
    step: Duration,
    pad: Duration,
}

impl WeatherEnricher {
    pub fn new() -> Self {
        Self {
            step: Duration::days(1),
            // Covers rounding at the far boundary of the grid.
            pad: Duration::minutes(10),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_step(step: Duration) -> Self {
        Self {
            step,
            pad: Duration::minutes(10),
        }
    }

    /// Attaches weather columns (`temperature`, `wind_speed`, `pressure_sea`,
    /// `rain_1h`) to `grid`.
    ///
    /// Every grid row receives the values of the observation nearest in time
    /// to its minute; when two observations are equidistant the earlier one
    /// wins. The grid's own rows are never filtered or reordered. Fails with
    /// [`WeatherError::NoObservations`] when every sub-range came back empty,
    /// since an unenrichable batch must not be written with all-null weather.
    pub async fn enrich<W: WfsClient>(
        &self,
        grid: DataFrame,
        client: &W,
    ) -> Result<DataFrame, WeatherError> {
        let Some((start, stop)) = time_bounds(&grid, "date_utc")? else {
            return Err(WeatherError::EmptyGrid);
        };

        let observations = self.fetch_all(client, start, stop + self.pad).await;
        let mut observations = dedupe_keep_first(observations);
        if observations.is_empty() {
            return Err(WeatherError::NoObservations { start, stop });
        }
        observations.sort_by_key(|obs| obs.time);
        fill_rainfall(&mut observations);

        // Reindex the observations onto the grid's minutes, then attach the
        // aligned columns with a plain left join on the timestamp.
        let minutes = minute_range(start, stop);
        let nearest = reindex_nearest(&observations, &minutes);
        let weather = df!(
            "date_utc" => &minutes,
            "temperature" => nearest.iter().map(|o| o.temperature).collect::<Vec<_>>(),
            "wind_speed" => nearest.iter().map(|o| o.wind_speed).collect::<Vec<_>>(),
            "pressure_sea" => nearest.iter().map(|o| o.pressure_sea).collect::<Vec<_>>(),
            "rain_1h" => nearest.iter().map(|o| o.rain_1h).collect::<Vec<_>>(),
        )?;

        let enriched = grid
            .lazy()
            .join(
                weather.lazy(),
                [col("date_utc")],
                [col("date_utc")],
                JoinArgs::new(JoinType::Left),
            )
            .sort(["date_utc", "name"], Default::default())
            .collect()?;
        Ok(enriched)
    }

    /// Fetches `start..=stop` in consecutive `step`-sized sub-ranges, each
    /// clamped to `stop`. A sub-range that errors is skipped.
    async fn fetch_all<W: WfsClient>(
        &self,
        client: &W,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Vec<WeatherObservation> {
        let mut observations = Vec::new();
        let mut range_start = start;
        while range_start < stop {
            let range_stop = (range_start + self.step).min(stop);
            match client.fetch_range(range_start, range_stop).await {
                Ok(mut rows) => observations.append(&mut rows),
                Err(e) => {
                    warn!(
                        "weather fetch for {} - {} failed, continuing without it: {}",
                        range_start, range_stop, e
                    );
                }
            }
            range_start += self.step;
        }
        observations
    }
}

impl Default for WeatherEnricher {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops observations whose exact timestamp was already seen. Consecutive
/// sub-ranges share their boundary instant, so duplicates are expected.
fn dedupe_keep_first(observations: Vec<WeatherObservation>) -> Vec<WeatherObservation> {
    let mut seen = HashSet::new();
    observations
        .into_iter()
        .filter(|obs| seen.insert(obs.time))
        .collect()
}

/// Forward-fills 1-hour rainfall, then back-fills the leading gap. Rainfall
/// is recorded only on the hour; carrying the last reading forward mirrors
/// what a live consumer of the feed would have known at that minute.
fn fill_rainfall(observations: &mut [WeatherObservation]) {
    let mut last = None;
    for obs in observations.iter_mut() {
        match obs.rain_1h {
            Some(v) => last = Some(v),
            None => obs.rain_1h = last,
        }
    }
    let mut next = None;
    for obs in observations.iter_mut().rev() {
        match obs.rain_1h {
            Some(v) => next = Some(v),
            None => obs.rain_1h = next,
        }
    }
}

/// Picks, for every grid minute, the observation nearest in time. Ties break
/// toward the earlier observation. `observations` must be sorted ascending
/// and non-empty.
fn reindex_nearest<'a>(
    observations: &'a [WeatherObservation],
    minutes: &[chrono::NaiveDateTime],
) -> Vec<&'a WeatherObservation> {
    minutes
        .iter()
        .map(|minute| {
            let target = minute.and_utc();
            match observations.binary_search_by_key(&target, |obs| obs.time) {
                Ok(i) => &observations[i],
                Err(0) => &observations[0],
                Err(i) if i == observations.len() => &observations[i - 1],
                Err(i) => {
                    let before = &observations[i - 1];
                    let after = &observations[i];
                    if target - before.time <= after.time - target {
                        before
                    } else {
                        after
                    }
                }
            }
        })
        .collect()
}
