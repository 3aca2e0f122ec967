//! GroupByAndSum: one row per distinct key, carrying the key and the summed field.
//!
//! Groups are emitted in order of first occurrence; sorting is left to a
//! downstream `Sort`. A `Null` key is a group like any other.

use std::collections::HashMap;

use async_trait::async_trait;
use epiflow_core::{Dataset, Error, Result, Row, Scalar};
use tracing::debug;

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

pub struct GroupByAndSum {
    child: OperatorRef,
    pub group_by: String,
    pub sum: String,
}

impl GroupByAndSum {
    pub fn new(child: OperatorRef, group_by: impl Into<String>, sum: impl Into<String>) -> Self {
        Self {
            child,
            group_by: group_by.into(),
            sum: sum.into(),
        }
    }
}

/// Integer sums stay integers until a float shows up.
#[derive(Debug, Clone, Copy)]
enum Total {
    Int(i64),
    Float(f64),
}

impl Total {
    fn add(self, value: &Scalar) -> std::result::Result<Total, String> {
        Ok(match (self, value) {
            (t, Scalar::Null) => t,
            (Total::Int(a), Scalar::I64(b)) => match a.checked_add(*b) {
                Some(sum) => Total::Int(sum),
                None => Total::Float(a as f64 + *b as f64),
            },
            (Total::Int(a), Scalar::F64(b)) => Total::Float(a as f64 + b),
            (Total::Float(a), Scalar::I64(b)) => Total::Float(a + *b as f64),
            (Total::Float(a), Scalar::F64(b)) => Total::Float(a + b),
            (_, other) => return Err(format!("cannot sum non-numeric value {other:?}")),
        })
    }

    fn into_scalar(self) -> Scalar {
        match self {
            Total::Int(v) => Scalar::I64(v),
            Total::Float(v) => Scalar::F64(v),
        }
    }
}

#[async_trait]
impl Operator for GroupByAndSum {
    fn name(&self) -> &'static str {
        "group_by_and_sum"
    }

    fn describe(&self) -> String {
        format!("by={} sum={}", self.group_by, self.sum)
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let input = self.child.evaluate(ctx).await?;

        let mut index: HashMap<&Scalar, usize> = HashMap::new();
        let mut groups: Vec<(&Scalar, Total)> = Vec::new();
        for row in &input {
            let key = row.value(&self.group_by);
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, Total::Int(0)));
                groups.len() - 1
            });
            let total = &mut groups[slot].1;
            *total = total
                .add(row.value(&self.sum))
                .map_err(|message| Error::transform(self.name(), message))?;
        }

        let output: Dataset = groups
            .into_iter()
            .map(|(key, total)| {
                Row::new()
                    .with(self.group_by.clone(), key.clone())
                    .with(self.sum.clone(), total.into_scalar())
            })
            .collect();
        debug!(
            op = self.name(),
            rows_in = input.len(),
            groups = output.len(),
            "evaluated"
        );
        Ok(output)
    }
}
