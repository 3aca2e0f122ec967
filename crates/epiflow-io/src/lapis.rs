//! Wire shapes of the aggregate query endpoint.
//!
//! Request: the filter object flattened together with a `fields` list.
//! Success: `{ "data": [ { <field>: scalar, ..., "count": int } ] }`.
//! Failure: `{ "error": ProblemDetail }` (a bare ProblemDetail is accepted too).

use epiflow_core::{Dataset, Error, ProblemDetail, Result, Row, Scalar};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the aggregate endpoint relative to the base URL.
pub const AGGREGATED_ENDPOINT: &str = "sample/aggregated";

/// Query constraints, field → value or list of values. Passed through verbatim;
/// key order is preserved.
pub type LapisFilter = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRequest<'a> {
    #[serde(flatten)]
    pub filter: &'a LapisFilter,
    pub fields: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Wrapped { error: ProblemDetail },
    Bare(ProblemDetail),
}

/// Decode a problem-detail error body, if the body is one.
pub fn parse_problem(body: &str) -> Option<ProblemDetail> {
    match serde_json::from_str::<ErrorBody>(body).ok()? {
        ErrorBody::Wrapped { error } => Some(error),
        ErrorBody::Bare(problem) => Some(problem),
    }
}

/// Build the dataset for a successful response body.
///
/// Each row holds the requested `fields` (in request order, `Null` when the
/// endpoint omitted one) followed by `count`.
pub fn parse_aggregated(body: &Value, fields: &[String]) -> Result<Dataset> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidResponse("expected an object with a 'data' array".into()))?;

    data.iter()
        .enumerate()
        .map(|(idx, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| Error::InvalidResponse(format!("data[{idx}] is not an object")))?;

            let count = match obj.get("count") {
                Some(Value::Number(n)) => n
                    .as_i64()
                    .map(Scalar::I64)
                    .or_else(|| n.as_f64().map(Scalar::F64))
                    .ok_or_else(|| Error::InvalidResponse(format!("data[{idx}].count out of range")))?,
                _ => {
                    return Err(Error::InvalidResponse(format!(
                        "data[{idx}].count missing or not a number"
                    )))
                }
            };

            let mut row = Row::new();
            for field in fields {
                let value = match obj.get(field) {
                    None => Scalar::Null,
                    Some(v) => json_to_scalar(v).ok_or_else(|| {
                        Error::InvalidResponse(format!("data[{idx}].{field} is not a scalar"))
                    })?,
                };
                row.set(field.clone(), value);
            }
            row.set("count", count);
            Ok(row)
        })
        .collect()
}

fn json_to_scalar(v: &Value) -> Option<Scalar> {
    Some(match v {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::I64(i),
            None => Scalar::F64(n.as_f64()?),
        },
        Value::String(s) => Scalar::Str(s.clone()),
        Value::Array(_) | Value::Object(_) => return None,
    })
}

/// Render a filter as URL query pairs: scalars as text (`null` → "null"),
/// arrays as one pair per element. Nested objects are rejected.
pub fn filter_to_query_params(filter: &LapisFilter) -> Result<Vec<(String, String)>> {
    let mut params = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        match value {
            Value::Array(items) => {
                for item in items {
                    params.push((key.clone(), scalar_param(key, item)?));
                }
            }
            other => params.push((key.clone(), scalar_param(key, other)?)),
        }
    }
    Ok(params)
}

fn scalar_param(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => Err(Error::Config(format!(
            "filter value for '{key}' must be a scalar or a list of scalars"
        ))),
    }
}

/// `filter_to_query_params` joined and URL-encoded.
pub fn filter_to_query_string(filter: &LapisFilter) -> Result<String> {
    let params = filter_to_query_params(filter)?;
    Ok(url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish())
}
