//! Sliding operator: reduce every contiguous window of `w` rows to one row.
//!
//! `n` input rows produce `max(0, n - w + 1)` outputs, in window order. The
//! child is expected to be sorted already.

use std::sync::Arc;

use async_trait::async_trait;
use epiflow_core::{Dataset, Error, Result, Row, Scalar};
use tracing::debug;

use crate::context::EvalContext;
use crate::traits::{Operator, OperatorRef};

/// `w` consecutive rows → one row. An `Err` is reported as `TransformFailed`.
pub type WindowFn = Arc<dyn Fn(&[Row]) -> std::result::Result<Row, String> + Send + Sync>;

pub struct Sliding {
    child: OperatorRef,
    pub window: usize,
    reducer: WindowFn,
}

impl Sliding {
    /// Fails with `Plan` when `window` is zero.
    pub fn new<F>(child: OperatorRef, window: usize, reducer: F) -> Result<Self>
    where
        F: Fn(&[Row]) -> std::result::Result<Row, String> + Send + Sync + 'static,
    {
        if window == 0 {
            return Err(Error::Plan("sliding window must be at least 1".into()));
        }
        Ok(Self {
            child,
            window,
            reducer: Arc::new(reducer),
        })
    }
}

/// Reducer: the row at index `floor(w / 2)` with `value` replaced by the
/// window's arithmetic mean. For even windows this picks the later of the two
/// middle rows.
pub fn centered_mean(
    value: impl Into<String>,
) -> impl Fn(&[Row]) -> std::result::Result<Row, String> + Send + Sync + 'static {
    let value = value.into();
    move |window: &[Row]| {
        let centre = window
            .get(window.len() / 2)
            .ok_or_else(|| "empty window".to_string())?;
        let mut sum = 0.0;
        for row in window {
            sum += match row.value(&value) {
                Scalar::Null => 0.0,
                other => other
                    .as_f64()
                    .ok_or_else(|| format!("'{value}' is not numeric: {other:?}"))?,
            };
        }
        Ok(centre
            .clone()
            .with(value.clone(), sum / window.len() as f64))
    }
}

#[async_trait]
impl Operator for Sliding {
    fn name(&self) -> &'static str {
        "sliding"
    }

    fn describe(&self) -> String {
        format!("window={}", self.window)
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset> {
        let input = self.child.evaluate(ctx).await?;
        // `windows` yields nothing when n < w.
        let output = input
            .rows
            .windows(self.window)
            .map(|w| (self.reducer)(w).map_err(|message| Error::transform(self.name(), message)))
            .collect::<Result<Dataset>>()?;
        debug!(
            op = self.name(),
            rows_in = input.len(),
            rows_out = output.len(),
            "evaluated"
        );
        Ok(output)
    }
}
