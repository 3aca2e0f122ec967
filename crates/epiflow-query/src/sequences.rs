//! Number of sequences over time: the shared sub-pipeline per filter, without division.

use std::time::Instant;

use epiflow_core::{Error, Granularity, Result, Row};
use epiflow_operators::{EvalContext, OperatorRef};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use crate::pipeline::{lapis_source, prepare_time_series, SeriesSource, COUNT_FIELD, DATE_RANGE_FIELD};
use crate::request::NamedFilter;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceCountPoint {
    pub date_range: Option<String>,
    pub count: f64,
}

impl SequenceCountPoint {
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            date_range: row
                .value(DATE_RANGE_FIELD)
                .as_opt_str()
                .ok_or_else(|| Error::transform("number_of_sequences", "dateRange is not a string"))?
                .map(str::to_owned),
            count: row
                .value(COUNT_FIELD)
                .as_f64()
                .ok_or_else(|| Error::transform("number_of_sequences", "count is not numeric"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceCountSeries {
    pub display_name: String,
    pub content: Vec<SequenceCountPoint>,
}

pub fn build_number_of_sequences_over_time(
    filters: &[NamedFilter],
    granularity: Granularity,
    smoothing_window: usize,
    source: &SeriesSource,
) -> Result<Vec<(String, OperatorRef)>> {
    filters
        .iter()
        .map(|f| {
            let plan = prepare_time_series(source(&f.filter), granularity, smoothing_window)?;
            Ok((f.display_name.clone(), plan))
        })
        .collect()
}

pub async fn query_number_of_sequences_over_time(
    filters: &[NamedFilter],
    granularity: Granularity,
    smoothing_window: usize,
    ctx: &EvalContext,
) -> Result<Vec<SequenceCountSeries>> {
    query_number_of_sequences_over_time_with(filters, granularity, smoothing_window, &lapis_source(), ctx)
        .await
}

pub async fn query_number_of_sequences_over_time_with(
    filters: &[NamedFilter],
    granularity: Granularity,
    smoothing_window: usize,
    source: &SeriesSource,
    ctx: &EvalContext,
) -> Result<Vec<SequenceCountSeries>> {
    let started = Instant::now();
    info!(filters = filters.len(), %granularity, smoothing_window, "sequence count query started");

    let plans = build_number_of_sequences_over_time(filters, granularity, smoothing_window, source)?;
    let series = try_join_all(plans.iter().map(|(display_name, plan)| async move {
        let content = plan
            .evaluate(ctx)
            .await?
            .iter()
            .map(SequenceCountPoint::from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok::<_, Error>(SequenceCountSeries {
            display_name: display_name.clone(),
            content,
        })
    }))
    .await?;

    info!(
        series = series.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sequence count query finished"
    );
    Ok(series)
}
