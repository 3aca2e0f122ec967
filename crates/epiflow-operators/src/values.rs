//! In-memory leaf: returns a fixed dataset on every evaluation.

use async_trait::async_trait;
use epiflow_core::{Dataset, Result, Row};

use crate::context::EvalContext;
use crate::traits::Operator;

#[derive(Debug, Clone, Default)]
pub struct Values {
    pub data: Dataset,
}

impl Values {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            data: Dataset::new(rows),
        }
    }
}

#[async_trait]
impl Operator for Values {
    fn name(&self) -> &'static str {
        "values"
    }

    fn describe(&self) -> String {
        format!("rows={}", self.data.len())
    }

    async fn evaluate(&self, _ctx: &EvalContext) -> Result<Dataset> {
        Ok(self.data.clone())
    }
}
