#![forbid(unsafe_code)]
//! epiflow-operators: lazy pipeline operators (map/group/fill/sort/sliding/division).
//!
//! Design intent:
//! - Each operator owns its children and a pure transformation fixed at construction.
//! - `evaluate` materializes the child's dataset, transforms it, and returns a new one;
//!   nothing downstream ever mutates an upstream dataset.
//! - Only leaves that do network I/O suspend. In-memory transforms run to
//!   completion once their inputs are ready.
//! - Child failures are returned unchanged.

pub mod context;
pub mod plan;
pub mod traits;

pub mod division;
pub mod fill_missing;
pub mod group_by;
pub mod map;
pub mod shared;
pub mod sliding;
pub mod sort;
pub mod values;

pub use context::EvalContext;
pub use division::Division;
pub use fill_missing::FillMissing;
pub use group_by::GroupByAndSum;
pub use map::{rename_field, Map};
pub use plan::render_plan;
pub use shared::Shared;
pub use sliding::{centered_mean, Sliding};
pub use sort::Sort;
pub use traits::{Operator, OperatorRef};
pub use values::Values;
