//! Prevalence over time: each numerator series divided by one shared
//! denominator series, bucket by bucket.

use std::sync::Arc;
use std::time::Instant;

use epiflow_core::{Error, Granularity, Result, Row};
use epiflow_operators::{Division, EvalContext, OperatorRef, Shared};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use crate::confidence::wilson_interval;
use crate::pipeline::{lapis_source, prepare_time_series, SeriesSource, COUNT_FIELD, DATE_RANGE_FIELD};
use crate::request::NamedFilter;

pub const PREVALENCE_FIELD: &str = "prevalence";
pub const TOTAL_FIELD: &str = "total";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrevalenceOverTimePoint {
    pub date_range: Option<String>,
    pub count: f64,
    /// Denominator count for the bucket; NaN when the denominator has no such bucket.
    pub total: f64,
    /// `count / total`; NaN when undefined. Serialized as `null` in that case.
    pub prevalence: f64,
}

impl PrevalenceOverTimePoint {
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        let date_range = row
            .value(DATE_RANGE_FIELD)
            .as_opt_str()
            .ok_or_else(|| Error::transform("prevalence", "dateRange is not a string"))?
            .map(str::to_owned);
        let count = row
            .value(COUNT_FIELD)
            .as_f64()
            .ok_or_else(|| Error::transform("prevalence", "count is not numeric"))?;
        Ok(Self {
            date_range,
            count,
            total: row.value(TOTAL_FIELD).as_f64().unwrap_or(f64::NAN),
            prevalence: row.value(PREVALENCE_FIELD).as_f64().unwrap_or(f64::NAN),
        })
    }

    /// Wilson score interval around `prevalence` at the given z.
    pub fn confidence_interval(&self, z: f64) -> Option<(f64, f64)> {
        wilson_interval(self.count, self.total, z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrevalenceOverTimeVariant {
    pub display_name: String,
    pub content: Vec<PrevalenceOverTimePoint>,
}

/// Assemble one Division plan per numerator, all reading the same
/// memoised denominator sub-pipeline.
pub fn build_prevalence_over_time(
    numerators: &[NamedFilter],
    denominator: &NamedFilter,
    granularity: Granularity,
    smoothing_window: usize,
    source: &SeriesSource,
) -> Result<Vec<(String, OperatorRef)>> {
    let denominator: OperatorRef = Arc::new(Shared::new(prepare_time_series(
        source(&denominator.filter),
        granularity,
        smoothing_window,
    )?));

    numerators
        .iter()
        .map(|numerator| {
            let series = prepare_time_series(source(&numerator.filter), granularity, smoothing_window)?;
            let division = Division::new(
                series,
                denominator.clone(),
                DATE_RANGE_FIELD,
                COUNT_FIELD,
                PREVALENCE_FIELD,
            )
            .with_total_field(TOTAL_FIELD);
            Ok((numerator.display_name.clone(), Arc::new(division) as OperatorRef))
        })
        .collect()
}

/// Prevalence series for every numerator against the denominator, fetched
/// from the context's endpoint. Output order follows `numerators`.
pub async fn query_prevalence_over_time(
    numerators: &[NamedFilter],
    denominator: &NamedFilter,
    granularity: Granularity,
    smoothing_window: usize,
    ctx: &EvalContext,
) -> Result<Vec<PrevalenceOverTimeVariant>> {
    query_prevalence_over_time_with(
        numerators,
        denominator,
        granularity,
        smoothing_window,
        &lapis_source(),
        ctx,
    )
    .await
}

/// As [`query_prevalence_over_time`] with a caller-supplied leaf factory.
pub async fn query_prevalence_over_time_with(
    numerators: &[NamedFilter],
    denominator: &NamedFilter,
    granularity: Granularity,
    smoothing_window: usize,
    source: &SeriesSource,
    ctx: &EvalContext,
) -> Result<Vec<PrevalenceOverTimeVariant>> {
    let started = Instant::now();
    info!(
        numerators = numerators.len(),
        %granularity,
        smoothing_window,
        "prevalence query started"
    );

    let plans = build_prevalence_over_time(
        numerators,
        denominator,
        granularity,
        smoothing_window,
        source,
    )?;
    let variants = try_join_all(plans.iter().map(|(display_name, plan)| async move {
        let data = plan.evaluate(ctx).await?;
        let content = data
            .iter()
            .map(PrevalenceOverTimePoint::from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok::<_, Error>(PrevalenceOverTimeVariant {
            display_name: display_name.clone(),
            content,
        })
    }))
    .await?;

    info!(
        variants = variants.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "prevalence query finished"
    );
    Ok(variants)
}
