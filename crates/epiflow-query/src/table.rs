//! Pivot query results into one row per date range.
//!
//! Rows cover every bucket between the smallest and largest date range in any
//! series. If any series has an unknown (`null`) bucket an `"Unknown"` row
//! comes first. Buckets a series lacks read as 0. Without any known bucket
//! the table is empty.

use std::collections::{BTreeSet, HashMap};

use epiflow_core::temporal::{generate_all_in_range, get_min_max_string};
use epiflow_core::{Error, Granularity, Result, Row, Scalar};

use crate::prevalence::PrevalenceOverTimeVariant;
use crate::sequences::SequenceCountSeries;

pub const UNKNOWN_DATE_RANGE: &str = "Unknown";

fn all_date_ranges<'a>(
    keys: impl IntoIterator<Item = Option<&'a str>>,
    granularity: Granularity,
) -> Result<Vec<Option<String>>> {
    let keys: BTreeSet<Option<&str>> = keys.into_iter().collect();
    let mut ranges: Vec<Option<String>> = match get_min_max_string(keys.iter().copied()) {
        Ok((min, max)) => generate_all_in_range(&min, &max, granularity)?
            .into_iter()
            .map(Some)
            .collect(),
        Err(Error::EmptyRange) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    if keys.contains(&None) {
        ranges.insert(0, None);
    }
    Ok(ranges)
}

fn key_cell(date_range: &Option<String>) -> Scalar {
    Scalar::from(date_range.as_deref().unwrap_or(UNKNOWN_DATE_RANGE))
}

/// One column per series named by its display name, holding the count.
/// The date range column is named after the granularity.
pub fn number_of_sequences_table(
    series: &[SequenceCountSeries],
    granularity: Granularity,
) -> Result<Vec<Row>> {
    let by_date: Vec<HashMap<Option<&str>, f64>> = series
        .iter()
        .map(|s| {
            s.content
                .iter()
                .map(|p| (p.date_range.as_deref(), p.count))
                .collect()
        })
        .collect();
    let ranges = all_date_ranges(
        series
            .iter()
            .flat_map(|s| s.content.iter().map(|p| p.date_range.as_deref())),
        granularity,
    )?;

    Ok(ranges
        .iter()
        .map(|range| {
            let mut row = Row::new().with(granularity.as_str(), key_cell(range));
            for (s, counts) in series.iter().zip(&by_date) {
                let count = counts.get(&range.as_deref()).copied().unwrap_or(0.0);
                row.set(s.display_name.clone(), count);
            }
            row
        })
        .collect())
}

/// Per variant a `"<name> prevalence"` and a `"<name> count"` column.
/// Missing buckets have prevalence `null` and count 0.
pub fn prevalence_table(
    variants: &[PrevalenceOverTimeVariant],
    granularity: Granularity,
) -> Result<Vec<Row>> {
    let by_date: Vec<HashMap<Option<&str>, (f64, f64)>> = variants
        .iter()
        .map(|v| {
            v.content
                .iter()
                .map(|p| (p.date_range.as_deref(), (p.prevalence, p.count)))
                .collect()
        })
        .collect();
    let ranges = all_date_ranges(
        variants
            .iter()
            .flat_map(|v| v.content.iter().map(|p| p.date_range.as_deref())),
        granularity,
    )?;

    Ok(ranges
        .iter()
        .map(|range| {
            let mut row = Row::new().with(granularity.as_str(), key_cell(range));
            for (v, points) in variants.iter().zip(&by_date) {
                let (prevalence, count) = match points.get(&range.as_deref()) {
                    Some(&(p, c)) if p.is_finite() => (Scalar::F64(p), c),
                    Some(&(_, c)) => (Scalar::Null, c),
                    None => (Scalar::Null, 0.0),
                };
                row.set(format!("{} prevalence", v.display_name), prevalence);
                row.set(format!("{} count", v.display_name), count);
            }
            row
        })
        .collect())
}
