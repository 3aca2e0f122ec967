//! FetchAggregated: the leaf operator backed by the aggregate endpoint.
//!
//! One POST per evaluation. The request races the context's cancellation
//! token; if the token fires first the in-flight request is dropped (aborting
//! it) and the evaluation fails with `Cancelled`. No partial data is returned.

use std::time::Instant;

use async_trait::async_trait;
use epiflow_core::{Dataset, Error, Result};
use epiflow_operators::{EvalContext, Operator};
use serde_json::Value;
use tracing::{debug, warn};

use crate::lapis::{parse_aggregated, parse_problem, AggregatedRequest, LapisFilter, AGGREGATED_ENDPOINT};

#[derive(Debug, Clone)]
pub struct FetchAggregated {
    pub filter: LapisFilter,
    pub fields: Vec<String>,
}

impl FetchAggregated {
    pub fn new(filter: LapisFilter, fields: Vec<String>) -> Self {
        Self { filter, fields }
    }

    fn url(&self, ctx: &EvalContext) -> Result<url::Url> {
        let base = format!("{}/", ctx.lapis());
        url::Url::parse(&base)
            .and_then(|u| u.join(AGGREGATED_ENDPOINT))
            .map_err(|e| Error::Config(format!("invalid lapis url '{}': {e}", ctx.lapis())))
    }

    async fn request(&self, ctx: &EvalContext, url: url::Url) -> Result<Dataset> {
        let body = AggregatedRequest {
            filter: &self.filter,
            fields: &self.fields,
        };
        let response = ctx
            .client()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::FetchFailed {
                status: e.status().map(|s| s.as_u16()),
                problem: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::FetchFailed {
            status: Some(status.as_u16()),
            problem: None,
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            let problem = parse_problem(&text);
            let message = problem
                .as_ref()
                .and_then(|p| p.detail.clone().or_else(|| p.title.clone()))
                .unwrap_or(text);
            return Err(Error::FetchFailed {
                status: Some(status.as_u16()),
                problem,
                message,
            });
        }

        let json: Value = serde_json::from_str(&text)?;
        parse_aggregated(&json, &self.fields)
    }
}

#[async_trait]
impl Operator for FetchAggregated {
    fn name(&self) -> &'static str {
        "fetch_aggregated"
    }

    fn describe(&self) -> String {
        let filter = serde_json::to_string(&self.filter).unwrap_or_default();
        format!("fields={:?} filter={filter}", self.fields)
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let url = self.url(ctx)?;
        let started = Instant::now();
        debug!(op = self.name(), %url, fields = ?self.fields, "fetching");

        let result = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(Error::Cancelled),
            res = self.request(ctx, url) => res,
        };

        match &result {
            Ok(data) => debug!(
                op = self.name(),
                rows = data.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "fetched"
            ),
            Err(Error::Cancelled) => debug!(op = self.name(), "fetch cancelled"),
            Err(e) => warn!(op = self.name(), error = %e, "fetch failed"),
        }
        result
    }
}
