//! Shared: evaluate a child once and hand the same dataset to every caller.
//!
//! Used for the denominator of a multi-numerator query so each Division reuses
//! one fetch instead of issuing its own. Concurrent callers wait for the first
//! evaluation. A failed evaluation is not cached; the next caller retries.

use async_trait::async_trait;
use epiflow_core::{Dataset, Result};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

pub struct Shared {
    child: OperatorRef,
    cell: OnceCell<Dataset>,
}

impl Shared {
    pub fn new(child: OperatorRef) -> Self {
        Self {
            child,
            cell: OnceCell::new(),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl Operator for Shared {
    fn name(&self) -> &'static str {
        "shared"
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let data = self
            .cell
            .get_or_try_init(|| async {
                debug!(op = self.name(), child = self.child.name(), "evaluating shared child");
                self.child.evaluate(ctx).await
            })
            .await?;
        Ok(data.clone())
    }
}
