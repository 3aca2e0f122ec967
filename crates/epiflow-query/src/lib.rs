#![forbid(unsafe_code)]
//! epiflow-query: named pipelines built from the operators.
//!
//! Every time series shares one sub-pipeline shape:
//! fetch → bucket dates → group & sum → fill missing buckets → sort → (smooth).
//! `prevalence` divides each numerator series by a shared denominator series;
//! `sequences` returns the series as-is. `table` pivots results per date range
//! and `confidence` adds Wilson intervals.

pub mod confidence;
pub mod pipeline;
pub mod prevalence;
pub mod request;
pub mod sequences;
pub mod table;

pub use confidence::{wilson_interval, Z_95};
pub use pipeline::{lapis_source, prepare_time_series, SeriesSource};
pub use prevalence::{
    build_prevalence_over_time, query_prevalence_over_time, query_prevalence_over_time_with,
    PrevalenceOverTimePoint, PrevalenceOverTimeVariant,
};
pub use request::{parse_request, NamedFilter, QueryKind, QueryOutput, QueryRequest, RequestConfig};
pub use sequences::{
    build_number_of_sequences_over_time, query_number_of_sequences_over_time,
    query_number_of_sequences_over_time_with, SequenceCountPoint, SequenceCountSeries,
};
pub use table::{number_of_sequences_table, prevalence_table};
