//! Division: join numerator and denominator on a key and emit their ratio.
//!
//! Output rows are the numerator rows (same order) extended with
//! `output = numerator.value / denominator.value` and `total = denominator.value`.
//! The numerator count stays in `value`, so both raw counts are available for
//! confidence intervals downstream.
//!
//! Missing denominator keys and zero denominators are data, not failures:
//! the ratio becomes NaN (serialized as `null`) and `total` is null/zero.

use std::collections::HashMap;

use async_trait::async_trait;
use epiflow_core::{Dataset, Result, Row, Scalar};
use tracing::debug;

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

pub struct Division {
    numerator: OperatorRef,
    denominator: OperatorRef,
    pub key: String,
    pub value: String,
    pub output: String,
    pub total: String,
}

impl Division {
    pub fn new(
        numerator: OperatorRef,
        denominator: OperatorRef,
        key: impl Into<String>,
        value: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            numerator,
            denominator,
            key: key.into(),
            value: value.into(),
            output: output.into(),
            total: "total".to_string(),
        }
    }

    /// Field receiving the denominator's raw value (default `total`).
    pub fn with_total_field(mut self, total: impl Into<String>) -> Self {
        self.total = total.into();
        self
    }

    fn divide(&self, numerator: &Row, denominator: Option<&Row>) -> Row {
        let total = denominator
            .map(|d| d.value(&self.value).clone())
            .unwrap_or(Scalar::Null);
        let ratio = match (numerator.value(&self.value).as_f64(), total.as_f64()) {
            (Some(n), Some(d)) if d != 0.0 => n / d,
            _ => f64::NAN,
        };
        numerator
            .clone()
            .with(self.output.clone(), ratio)
            .with(self.total.clone(), total)
    }
}

#[async_trait]
impl Operator for Division {
    fn name(&self) -> &'static str {
        "division"
    }

    fn describe(&self) -> String {
        format!("key={} value={} -> {}", self.key, self.value, self.output)
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.numerator.as_ref(), self.denominator.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let (numerator, denominator) = futures::try_join!(
            self.numerator.evaluate(ctx),
            self.denominator.evaluate(ctx)
        )?;

        // Later rows win on duplicate keys.
        let lookup: HashMap<&Scalar, &Row> = denominator
            .iter()
            .map(|row| (row.value(&self.key), row))
            .collect();

        let output: Dataset = numerator
            .iter()
            .map(|row| self.divide(row, lookup.get(row.value(&self.key)).copied()))
            .collect();
        debug!(
            op = self.name(),
            numerator = numerator.len(),
            denominator = denominator.len(),
            unmatched = numerator
                .iter()
                .filter(|r| !lookup.contains_key(r.value(&self.key)))
                .count(),
            "evaluated"
        );
        Ok(output)
    }
}
