#![forbid(unsafe_code)]
//! epiflow-core: shared data model for the operator pipeline.
//!
//! - `types`: `Scalar`, `Row`, `Dataset`
//! - `temporal`: granularity bucketing and date-range generation
//! - `error`: the condition taxonomy every operator propagates unchanged
//! - `config`: client configuration with env overrides
//!
//! No async, HTTP or runtime here; those live in `epiflow-operators` / `epiflow-io`.

pub mod config;
pub mod error;
pub mod temporal;
pub mod types;

pub use error::{Error, ProblemDetail, Result};
pub use temporal::Granularity;
pub use types::{Dataset, Row, Scalar};
