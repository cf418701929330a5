use crate::bikes::error::BikeDataError;
use crate::utils::{minute_range, time_bounds};
use polars::prelude::*;

/// Expands a batch's table to the full minute-by-station grid.
///
/// The output has exactly one row for every combination of a whole minute
/// between the table's earliest and latest timestamp (inclusive) and a
/// station name observed in the table. Combinations absent from the input get
/// null availability values; observed rows keep theirs. Duplicate
/// (timestamp, name) input rows resolve last-write-wins. Rows come back
/// sorted by (timestamp, name). An empty input yields an empty output, which
/// the caller must guard against.
pub fn complete_grid(data: &DataFrame) -> Result<DataFrame, BikeDataError> {
    let Some((start, stop)) = time_bounds(data, "date_utc")? else {
        return Ok(data.clone());
    };

    let minutes = df!("date_utc" => &minute_range(start, stop))?;
    let names = data
        .clone()
        .lazy()
        .select([col("name")])
        .unique_stable(None, UniqueKeepStrategy::First);
    let observed = data.clone().lazy().unique_stable(
        Some(vec!["date_utc".into(), "name".into()]),
        UniqueKeepStrategy::Last,
    );

    let grid = minutes
        .lazy()
        .cross_join(names, None)
        .join(
            observed,
            [col("date_utc"), col("name")],
            [col("date_utc"), col("name")],
            JoinArgs::new(JoinType::Left),
        )
        .sort(["date_utc", "name"], Default::default())
        .collect()?;
    Ok(grid)
}
