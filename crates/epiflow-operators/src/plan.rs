//! Plan rendering: an indented view of an operator tree for `explain`.

use std::fmt::Write;

use crate::traits::Operator;

/// Render `root` and its descendants, one operator per line.
///
/// ```text
/// division [key=dateRange value=count -> prevalence]
///   sliding [window=7]
///     sort
///       ...
/// ```
pub fn render_plan(root: &dyn Operator) -> String {
    let mut out = String::new();
    render_into(root, 0, &mut out);
    out
}

fn render_into(op: &dyn Operator, depth: usize, out: &mut String) {
    let details = op.describe();
    // Writing into a String cannot fail.
    let _ = if details.is_empty() {
        writeln!(out, "{:indent$}{}", "", op.name(), indent = depth * 2)
    } else {
        writeln!(
            out,
            "{:indent$}{} [{}]",
            "",
            op.name(),
            details,
            indent = depth * 2
        )
    };
    for child in op.children() {
        render_into(child, depth + 1, out);
    }
}
