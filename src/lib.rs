#![forbid(unsafe_code)]
//! epiflow: lazy operator pipelines over epidemiological aggregate queries.
//!
//! Facade over the workspace crates:
//! - [`core`]: data model, temporal bucketing, errors, client configuration
//! - [`operators`]: the `Operator` trait and the in-memory transforms
//! - [`io`]: the aggregate endpoint and its fetch leaf
//! - [`query`]: prevalence and sequence-count pipelines, tables, request documents

pub use epiflow_core as core;
pub use epiflow_io as io;
pub use epiflow_operators as operators;
pub use epiflow_query as query;

pub use epiflow_core::{Dataset, Error, Granularity, Result, Row, Scalar};
pub use epiflow_operators::{EvalContext, Operator, OperatorRef};
pub use epiflow_query::{query_number_of_sequences_over_time, query_prevalence_over_time};
