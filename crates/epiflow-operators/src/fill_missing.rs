//! FillMissing: append synthesized rows for keys absent from the child's output.
//!
//! Existing rows are never altered or removed. When the range function reports
//! `EmptyRange` (no usable keys) the child's dataset is returned unfilled.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use epiflow_core::{Dataset, Error, Result, Row, Scalar};
use tracing::{debug, trace};

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

/// All key values present in the data → `(min, max)`.
pub type RangeFn = Arc<dyn Fn(&[&Scalar]) -> Result<(Scalar, Scalar)> + Send + Sync>;
/// `(min, max)` → every key that should exist, in order.
pub type GenerateFn = Arc<dyn Fn(&Scalar, &Scalar) -> Result<Vec<Scalar>> + Send + Sync>;
/// Missing key → placeholder row.
pub type DefaultRowFn = Arc<dyn Fn(&Scalar) -> Row + Send + Sync>;

pub struct FillMissing {
    child: OperatorRef,
    pub key: String,
    range: RangeFn,
    generate: GenerateFn,
    default_row: DefaultRowFn,
}

impl FillMissing {
    pub fn new<R, G, D>(
        child: OperatorRef,
        key: impl Into<String>,
        range: R,
        generate: G,
        default_row: D,
    ) -> Self
    where
        R: Fn(&[&Scalar]) -> Result<(Scalar, Scalar)> + Send + Sync + 'static,
        G: Fn(&Scalar, &Scalar) -> Result<Vec<Scalar>> + Send + Sync + 'static,
        D: Fn(&Scalar) -> Row + Send + Sync + 'static,
    {
        Self {
            child,
            key: key.into(),
            range: Arc::new(range),
            generate: Arc::new(generate),
            default_row: Arc::new(default_row),
        }
    }
}

#[async_trait]
impl Operator for FillMissing {
    fn name(&self) -> &'static str {
        "fill_missing"
    }

    fn describe(&self) -> String {
        format!("key={}", self.key)
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let input = self.child.evaluate(ctx).await?;

        let present: HashSet<&Scalar> = input.column(&self.key).collect();
        let keys: Vec<&Scalar> = present.iter().copied().collect();

        let (min, max) = match (self.range)(&keys) {
            Ok(bounds) => bounds,
            Err(Error::EmptyRange) => {
                debug!(op = self.name(), rows = input.len(), "empty key range, nothing to fill");
                return Ok(input);
            }
            Err(e) => return Err(e),
        };

        let missing: Vec<Row> = (self.generate)(&min, &max)?
            .into_iter()
            .filter(|key| !present.contains(key))
            .map(|key| {
                trace!(op = self.name(), %key, "synthesizing row");
                (self.default_row)(&key)
            })
            .collect();

        debug!(
            op = self.name(),
            rows_in = input.len(),
            filled = missing.len(),
            "evaluated"
        );
        let mut rows = input.into_rows();
        rows.extend(missing);
        Ok(Dataset::new(rows))
    }
}
