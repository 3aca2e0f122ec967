//! The shared time-series sub-pipeline.
//!
//! Numerator and denominator series are built by the same function so their
//! bucketing, gap filling, ordering and smoothing can never drift apart.

use std::cmp::Ordering;
use std::sync::Arc;

use epiflow_core::temporal::{
    bucket_for, compare_bucket_keys, generate_all_in_range, get_min_max_string, Granularity,
};
use epiflow_core::{Error, Result, Row, Scalar};
use epiflow_io::{FetchAggregated, LapisFilter};
use epiflow_operators::{
    centered_mean, FillMissing, GroupByAndSum, Map, OperatorRef, Sliding, Sort,
};

pub const DATE_FIELD: &str = "date";
pub const DATE_RANGE_FIELD: &str = "dateRange";
pub const COUNT_FIELD: &str = "count";

/// Produces the leaf operator for a filter. The leaf must yield rows with a
/// nullable `date` string and a numeric `count`.
pub type SeriesSource = Arc<dyn Fn(&LapisFilter) -> OperatorRef + Send + Sync>;

/// Leaves backed by the aggregate endpoint, grouped by `date`.
pub fn lapis_source() -> SeriesSource {
    Arc::new(|filter: &LapisFilter| -> OperatorRef {
        Arc::new(FetchAggregated::new(
            filter.clone(),
            vec![DATE_FIELD.to_string()],
        ))
    })
}

/// fetch → bucket → group & sum → fill missing → sort → optional smoothing.
///
/// A `smoothing_window` of 0 disables smoothing.
pub fn prepare_time_series(
    leaf: OperatorRef,
    granularity: Granularity,
    smoothing_window: usize,
) -> Result<OperatorRef> {
    let bucketed = Map::new(leaf, move |row| bucket_row(row, granularity)).labelled("bucket_dates");
    let grouped = GroupByAndSum::new(Arc::new(bucketed), DATE_RANGE_FIELD, COUNT_FIELD);
    let filled = FillMissing::new(
        Arc::new(grouped),
        DATE_RANGE_FIELD,
        bucket_bounds,
        move |min: &Scalar, max: &Scalar| all_buckets(min, max, granularity),
        |key: &Scalar| {
            Row::new()
                .with(DATE_RANGE_FIELD, key.clone())
                .with(COUNT_FIELD, 0i64)
        },
    );
    let sorted: OperatorRef = Arc::new(Sort::new(Arc::new(filled), date_range_cmp));

    if smoothing_window == 0 {
        return Ok(sorted);
    }
    let smoothed = Sliding::new(sorted, smoothing_window, centered_mean(COUNT_FIELD))?;
    Ok(Arc::new(smoothed))
}

/// `{date, count, ..}` → `{dateRange, count}`.
fn bucket_row(row: &Row, granularity: Granularity) -> std::result::Result<Row, String> {
    let date = row
        .value(DATE_FIELD)
        .as_opt_str()
        .ok_or_else(|| format!("'{DATE_FIELD}' must be a string or null"))?;
    let bucket = bucket_for(date, granularity).map_err(|e| e.to_string())?;
    Ok(Row::new()
        .with(DATE_RANGE_FIELD, bucket)
        .with(COUNT_FIELD, row.value(COUNT_FIELD).clone()))
}

fn bucket_key(value: &Scalar) -> Result<Option<&str>> {
    value
        .as_opt_str()
        .ok_or_else(|| Error::transform("fill_missing", format!("bucket key {value:?} is not a string")))
}

fn bucket_bounds(keys: &[&Scalar]) -> Result<(Scalar, Scalar)> {
    let keys = keys
        .iter()
        .map(|k| bucket_key(k))
        .collect::<Result<Vec<_>>>()?;
    let (min, max) = get_min_max_string(keys)?;
    Ok((Scalar::Str(min), Scalar::Str(max)))
}

fn all_buckets(min: &Scalar, max: &Scalar, granularity: Granularity) -> Result<Vec<Scalar>> {
    let (Some(min), Some(max)) = (bucket_key(min)?, bucket_key(max)?) else {
        return Err(Error::EmptyRange);
    };
    Ok(generate_all_in_range(min, max, granularity)?
        .into_iter()
        .map(Scalar::Str)
        .collect())
}

/// Ascending by bucket; unknown (`null`) buckets last.
pub fn date_range_cmp(a: &Row, b: &Row) -> Ordering {
    compare_bucket_keys(
        a.value(DATE_RANGE_FIELD).as_str(),
        b.value(DATE_RANGE_FIELD).as_str(),
    )
}
