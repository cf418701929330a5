use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use polars::prelude::*;

/// Drops the seconds from a timestamp. Source files are written on whole
/// minutes; the stamp applied to their rows must match the grid resolution.
pub(crate) fn truncate_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::seconds(i64::from(t.second()))
}

/// Every whole minute between `start` and `stop`, inclusive on both ends.
pub(crate) fn minute_range(start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<NaiveDateTime> {
    let mut minutes = Vec::new();
    let mut t = start;
    while t <= stop {
        minutes.push(t.naive_utc());
        t += Duration::minutes(1);
    }
    minutes
}

/// Min and max of a datetime column, or `None` when the frame is empty.
pub(crate) fn time_bounds(
    df: &DataFrame,
    column: &str,
) -> PolarsResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    let series = df.column(column)?.as_materialized_series();
    let ca = series.datetime()?;
    let (Some(min), Some(max)) = (ca.min(), ca.max()) else {
        return Ok(None);
    };
    let unit = ca.time_unit();
    Ok(from_timestamp(min, unit).zip(from_timestamp(max, unit)))
}

pub(crate) fn from_timestamp(value: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    }
}
