//! Operator trait + common interfaces.
//!
//! A pipeline is a tree of operators. Calling `evaluate` on the root pulls
//! every child's dataset, so building a pipeline is free and evaluating it is
//! where all work (and the network I/O of the leaves) happens.

use std::sync::Arc;

use async_trait::async_trait;
use epiflow_core::{Dataset, Result};

use crate::context::EvalContext;

/// Operators are shared by reference so one sub-pipeline can feed several
/// combinators (see `Shared`).
pub type OperatorRef = Arc<dyn Operator>;

/// Trait that all operators must implement.
///
/// Invariants:
/// - `evaluate` returns a fresh `Dataset`; it never mutates a child's output.
/// - Evaluation is idempotent. Only leaves performing I/O have side effects.
/// - Errors from children are propagated unchanged.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Parameters shown next to the name when rendering a plan.
    fn describe(&self) -> String {
        String::new()
    }

    /// Direct children, left to right.
    fn children(&self) -> Vec<&dyn Operator> {
        Vec::new()
    }

    /// Materialize this operator's output.
    async fn evaluate(&self, ctx: &EvalContext) -> Result<Dataset>;
}
