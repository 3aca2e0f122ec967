//! Request documents (YAML or JSON) describing one query.
//!
//! Example:
//! ```yaml
//! config:
//!   lapis_url: "https://lapis.example.org/open"
//! query: prevalenceOverTime
//! numerators:
//!   - displayName: "XBB"
//!     filter: { country: "Switzerland", nextcladePangoLineage: "XBB*" }
//! denominator:
//!   displayName: "All"
//!   filter: { country: "Switzerland" }
//! granularity: month
//! smoothingWindow: 3
//! ```

use epiflow_core::config::ClientConfig;
use epiflow_core::{Error, Granularity, Result, Row};
use epiflow_io::LapisFilter;
use epiflow_operators::{EvalContext, OperatorRef};
use serde::{Deserialize, Deserializer, Serialize};

use crate::pipeline::{lapis_source, SeriesSource};
use crate::prevalence::{
    build_prevalence_over_time, query_prevalence_over_time_with, PrevalenceOverTimeVariant,
};
use crate::sequences::{
    build_number_of_sequences_over_time, query_number_of_sequences_over_time_with,
    SequenceCountSeries,
};
use crate::table::{number_of_sequences_table, prevalence_table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedFilter {
    pub display_name: String,
    #[serde(default)]
    pub filter: LapisFilter,
}

impl NamedFilter {
    pub fn new(display_name: impl Into<String>, filter: LapisFilter) -> Self {
        Self {
            display_name: display_name.into(),
            filter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKind {
    #[default]
    PrevalenceOverTime,
    NumberOfSequencesOverTime,
}

/// Endpoint overrides carried by the document itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub lapis_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl RequestConfig {
    /// Layer the document's settings over `cfg`.
    pub fn apply(&self, cfg: &mut ClientConfig) {
        if let Some(url) = &self.lapis_url {
            cfg.lapis_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            cfg.timeout_ms = Some(ms);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub config: RequestConfig,
    #[serde(default)]
    pub query: QueryKind,
    #[serde(alias = "numerator", deserialize_with = "one_or_many")]
    pub numerators: Vec<NamedFilter>,
    #[serde(default)]
    pub denominator: Option<NamedFilter>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub smoothing_window: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(NamedFilter),
    Many(Vec<NamedFilter>),
}

fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<NamedFilter>, D::Error> {
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(f) => vec![f],
        OneOrMany::Many(fs) => fs,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Prevalence(Vec<PrevalenceOverTimeVariant>),
    NumberOfSequences(Vec<SequenceCountSeries>),
}

impl QueryOutput {
    pub fn table(&self, granularity: Granularity) -> Result<Vec<Row>> {
        match self {
            QueryOutput::Prevalence(v) => prevalence_table(v, granularity),
            QueryOutput::NumberOfSequences(s) => number_of_sequences_table(s, granularity),
        }
    }
}

impl QueryRequest {
    pub fn validate(&self) -> Result<()> {
        if self.numerators.is_empty() {
            return Err(Error::Config("request needs at least one numerator".into()));
        }
        if self.query == QueryKind::PrevalenceOverTime && self.denominator.is_none() {
            return Err(Error::Config(
                "prevalenceOverTime requests need a denominator".into(),
            ));
        }
        Ok(())
    }

    fn denominator(&self) -> Result<&NamedFilter> {
        self.denominator
            .as_ref()
            .ok_or_else(|| Error::Config("missing denominator".into()))
    }

    /// The operator plans this request evaluates, one per numerator.
    pub fn build(&self, source: &SeriesSource) -> Result<Vec<(String, OperatorRef)>> {
        self.validate()?;
        match self.query {
            QueryKind::PrevalenceOverTime => build_prevalence_over_time(
                &self.numerators,
                self.denominator()?,
                self.granularity,
                self.smoothing_window,
                source,
            ),
            QueryKind::NumberOfSequencesOverTime => build_number_of_sequences_over_time(
                &self.numerators,
                self.granularity,
                self.smoothing_window,
                source,
            ),
        }
    }

    pub async fn run(&self, ctx: &EvalContext) -> Result<QueryOutput> {
        self.run_with(&lapis_source(), ctx).await
    }

    pub async fn run_with(&self, source: &SeriesSource, ctx: &EvalContext) -> Result<QueryOutput> {
        self.validate()?;
        Ok(match self.query {
            QueryKind::PrevalenceOverTime => QueryOutput::Prevalence(
                query_prevalence_over_time_with(
                    &self.numerators,
                    self.denominator()?,
                    self.granularity,
                    self.smoothing_window,
                    source,
                    ctx,
                )
                .await?,
            ),
            QueryKind::NumberOfSequencesOverTime => QueryOutput::NumberOfSequences(
                query_number_of_sequences_over_time_with(
                    &self.numerators,
                    self.granularity,
                    self.smoothing_window,
                    source,
                    ctx,
                )
                .await?,
            ),
        })
    }
}

/// Parse and validate a request document. JSON is accepted as YAML.
pub fn parse_request(src: &str) -> Result<QueryRequest> {
    let request: QueryRequest =
        serde_yaml::from_str(src).map_err(|e| Error::Config(format!("invalid request: {e}")))?;
    request.validate()?;
    Ok(request)
}
