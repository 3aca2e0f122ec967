//! Sort operator: full stable sort of the materialized dataset.
//!
//! Stability matters: rows that tie under the comparator keep the relative
//! order produced upstream by GroupByAndSum/FillMissing.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use epiflow_core::types::scalar_cmp;
use epiflow_core::{Dataset, Result, Row};
use tracing::debug;

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

pub type RowCmp = Arc<dyn Fn(&Row, &Row) -> Ordering + Send + Sync>;

pub struct Sort {
    child: OperatorRef,
    cmp: RowCmp,
    by: Option<String>,
}

impl Sort {
    pub fn new<C>(child: OperatorRef, cmp: C) -> Self
    where
        C: Fn(&Row, &Row) -> Ordering + Send + Sync + 'static,
    {
        Self {
            child,
            cmp: Arc::new(cmp),
            by: None,
        }
    }

    /// Ascending by one field; nulls last.
    pub fn by_field(child: OperatorRef, field: impl Into<String>) -> Self {
        let field = field.into();
        let key = field.clone();
        let mut sort = Self::new(child, move |a, b| scalar_cmp(a.value(&key), b.value(&key)));
        sort.by = Some(field);
        sort
    }
}

#[async_trait]
impl Operator for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn describe(&self) -> String {
        self.by.as_ref().map(|f| format!("by={f}")).unwrap_or_default()
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let mut rows = self.child.evaluate(ctx).await?.into_rows();
        // `sort_by` is a stable merge sort.
        rows.sort_by(|a, b| (self.cmp)(a, b));
        debug!(op = self.name(), rows = rows.len(), "evaluated");
        Ok(Dataset::new(rows))
    }
}
