//! Map operator: one output row per input row, order preserved.

use std::sync::Arc;

use async_trait::async_trait;
use epiflow_core::{Dataset, Error, Result, Row};
use tracing::debug;

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

/// Row transformation. An `Err` is reported as `TransformFailed`.
pub type RowFn = Arc<dyn Fn(&Row) -> std::result::Result<Row, String> + Send + Sync>;

pub struct Map {
    child: OperatorRef,
    f: RowFn,
    label: &'static str,
}

impl Map {
    pub fn new<F>(child: OperatorRef, f: F) -> Self
    where
        F: Fn(&Row) -> std::result::Result<Row, String> + Send + Sync + 'static,
    {
        Self {
            child,
            f: Arc::new(f),
            label: "map",
        }
    }

    /// Name reported by `Operator::name` (and in `TransformFailed`).
    pub fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

/// Copy `old` into a new field `new` on every row. The old field is kept.
pub fn rename_field(child: OperatorRef, old: impl Into<String>, new: impl Into<String>) -> Map {
    let (old, new) = (old.into(), new.into());
    Map::new(child, move |row| {
        let value = row.value(&old).clone();
        Ok(row.clone().with(new.clone(), value))
    })
    .labelled("rename_field")
}

#[async_trait]
impl Operator for Map {
    fn name(&self) -> &'static str {
        self.label
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let input = self.child.evaluate(ctx).await?;
        let output = input
            .iter()
            .map(|row| (self.f)(row).map_err(|message| Error::transform(self.label, message)))
            .collect::<Result<Dataset>>()?;
        debug!(op = self.label, rows = output.len(), "evaluated");
        Ok(output)
    }
}
