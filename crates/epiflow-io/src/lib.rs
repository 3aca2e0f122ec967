#![forbid(unsafe_code)]
//! epiflow-io: the only crate that talks to the network.
//!
//! - `lapis`: request/response shapes of the aggregate endpoint, filter → query params
//! - `fetch`: `FetchAggregated`, the leaf operator issuing one request per evaluation
//! - `client`: HTTP client + `EvalContext` construction from `ClientConfig`

pub mod client;
pub mod fetch;
pub mod lapis;

pub use client::{build_client, context_from_config};
pub use fetch::FetchAggregated;
pub use lapis::{filter_to_query_params, AggregatedRequest, LapisFilter, AGGREGATED_ENDPOINT};
