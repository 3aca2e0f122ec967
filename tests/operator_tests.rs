//! In-memory operator behaviour: Map, GroupByAndSum, FillMissing, Sort,
//! Sliding, Division, Shared and plan rendering.

mod test_support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use epiflow_core::{Error, Row, Scalar};
use epiflow_operators::{
    centered_mean, rename_field, render_plan, Division, FillMissing, GroupByAndSum, Map, Operator,
    OperatorRef, Shared, Sliding, Sort, Values,
};
use test_support::{ids, offline_ctx, CountingLeaf};

fn int(v: i64) -> Scalar {
    Scalar::I64(v)
}

fn text(v: &str) -> Scalar {
    Scalar::from(v)
}

fn values(rows: Vec<Row>) -> OperatorRef {
    Arc::new(Values::new(rows))
}

fn id_rows(ids: &[i64]) -> Vec<Row> {
    ids.iter().map(|&id| Row::new().with("id", id)).collect()
}

fn int_range(keys: &[&Scalar]) -> epiflow_core::Result<(Scalar, Scalar)> {
    let ids: Vec<i64> = keys
        .iter()
        .filter_map(|k| match k {
            Scalar::I64(v) => Some(*v),
            _ => None,
        })
        .collect();
    match (ids.iter().min(), ids.iter().max()) {
        (Some(&lo), Some(&hi)) => Ok((Scalar::I64(lo), Scalar::I64(hi))),
        _ => Err(Error::EmptyRange),
    }
}

fn int_generate(min: &Scalar, max: &Scalar) -> epiflow_core::Result<Vec<Scalar>> {
    match (min, max) {
        (Scalar::I64(lo), Scalar::I64(hi)) => Ok((*lo..=*hi).map(Scalar::I64).collect()),
        _ => Err(Error::transform("fill_missing", "non-integer bounds")),
    }
}

fn fill_ids(child: OperatorRef) -> FillMissing {
    FillMissing::new(child, "id", int_range, int_generate, |k: &Scalar| {
        Row::new().with("id", k.clone())
    })
}

#[tokio::test]
async fn test_map_preserves_order_and_cardinality() {
    let map = Map::new(values(id_rows(&[3, 1, 2])), |row| {
        let id = row.value("id").as_f64().ok_or("id")?;
        Ok(row.clone().with("double", id * 2.0))
    });

    let out = map.evaluate(&offline_ctx()).await.expect("map");
    assert_eq!(ids(&out, "id"), vec![int(3), int(1), int(2)]);
    assert_eq!(ids(&out, "double"), vec![Scalar::F64(6.0), Scalar::F64(2.0), Scalar::F64(4.0)]);
}

#[tokio::test]
async fn test_map_failure_is_transform_failed() {
    let map = Map::new(values(id_rows(&[1])), |_| Err("boom".to_string())).labelled("explode");

    match map.evaluate(&offline_ctx()).await {
        Err(Error::TransformFailed { op, message }) => {
            assert_eq!(op, "explode");
            assert_eq!(message, "boom");
        }
        other => panic!("expected TransformFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rename_field_keeps_old_field() {
    let rename = rename_field(values(vec![Row::new().with("date", "2023-01-01")]), "date", "day");

    let out = rename.evaluate(&offline_ctx()).await.expect("rename");
    let row = &out.rows[0];
    assert_eq!(row.value("date"), &Scalar::from("2023-01-01"));
    assert_eq!(row.value("day"), &Scalar::from("2023-01-01"));
    assert_eq!(rename.name(), "rename_field");
}

#[tokio::test]
async fn test_group_by_and_sum_conserves_mass() {
    let rows = vec![
        Row::new().with("k", "a").with("n", 1i64),
        Row::new().with("k", "b").with("n", 10i64),
        Row::new().with("k", "a").with("n", 2i64),
        Row::new().with("k", Scalar::Null).with("n", 5i64),
        Row::new().with("k", "b").with("n", Scalar::Null),
        Row::new().with("k", "a").with("n", 0.5),
    ];
    let op = GroupByAndSum::new(values(rows), "k", "n");

    let out = op.evaluate(&offline_ctx()).await.expect("group");
    // One row per distinct key, in order of first occurrence.
    assert_eq!(ids(&out, "k"), vec![text("a"), text("b"), Scalar::Null]);
    assert_eq!(ids(&out, "n"), vec![Scalar::F64(3.5), int(10), int(5)]);

    let total: f64 = out.column("n").filter_map(Scalar::as_f64).sum();
    assert_eq!(total, 18.5);
    assert!(out.iter().all(|r| r.len() == 2));
}

#[tokio::test]
async fn test_group_by_and_sum_rejects_non_numeric() {
    let rows = vec![Row::new().with("k", "a").with("n", "seven")];
    let op = GroupByAndSum::new(values(rows), "k", "n");

    let err = op.evaluate(&offline_ctx()).await.unwrap_err();
    assert!(matches!(err, Error::TransformFailed { op: "group_by_and_sum", .. }));
}

#[tokio::test]
async fn test_fill_missing_adds_only_missing_keys() {
    let out = fill_ids(values(id_rows(&[1, 3])))
        .evaluate(&offline_ctx())
        .await
        .expect("fill");

    let mut got: Vec<i64> = out
        .column("id")
        .map(|s| match s {
            Scalar::I64(v) => *v,
            other => panic!("unexpected id {other:?}"),
        })
        .collect();
    // Input rows come first, synthesized rows after.
    assert_eq!(got, vec![1, 3, 2]);
    got.sort();
    assert_eq!(got, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_fill_missing_empty_range_returns_input() {
    let ctx = offline_ctx();

    let out = fill_ids(values(vec![])).evaluate(&ctx).await.expect("empty");
    assert!(out.is_empty());

    let nulls = vec![Row::new().with("id", Scalar::Null).with("tag", "x")];
    let out = fill_ids(values(nulls.clone())).evaluate(&ctx).await.expect("nulls");
    assert_eq!(out.rows, nulls);
}

#[tokio::test]
async fn test_fill_missing_propagates_generator_errors() {
    let op = FillMissing::new(
        values(id_rows(&[1, 2])),
        "id",
        int_range,
        |_: &Scalar, _: &Scalar| Err(Error::InvalidDate("nope".into())),
        |k: &Scalar| Row::new().with("id", k.clone()),
    );

    let err = op.evaluate(&offline_ctx()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidDate(_)));
}

#[tokio::test]
async fn test_sort_is_stable_and_idempotent() {
    let rows = vec![
        Row::new().with("k", 2i64).with("tag", "a"),
        Row::new().with("k", Scalar::Null).with("tag", "n"),
        Row::new().with("k", 1i64).with("tag", "b"),
        Row::new().with("k", 2i64).with("tag", "c"),
        Row::new().with("k", 1i64).with("tag", "d"),
    ];
    let ctx = offline_ctx();

    let once = Sort::by_field(values(rows), "k").evaluate(&ctx).await.expect("sort");
    assert_eq!(
        ids(&once, "tag"),
        vec![text("b"), text("d"), text("a"), text("c"), text("n")]
    );

    let twice = Sort::by_field(values(once.rows.clone()), "k")
        .evaluate(&ctx)
        .await
        .expect("sort again");
    assert_eq!(twice, once);
}

#[tokio::test]
async fn test_sliding_sum_tags_middle_row() {
    let rows: Vec<Row> = (1..=5)
        .map(|i| Row::new().with("id", i as i64).with("value", i as i64))
        .collect();
    let sliding = Sliding::new(values(rows), 3, |w: &[Row]| {
        let sum: i64 = w
            .iter()
            .map(|r| match r.value("value") {
                Scalar::I64(v) => *v,
                _ => 0,
            })
            .sum();
        Ok(Row::new()
            .with("id", w[w.len() / 2].value("id").clone())
            .with("sum", sum))
    })
    .expect("window");

    let out = sliding.evaluate(&offline_ctx()).await.expect("sliding");
    let expected: Vec<Row> = [(2, 6), (3, 9), (4, 12)]
        .iter()
        .map(|&(id, sum)| Row::new().with("id", id as i64).with("sum", sum as i64))
        .collect();
    assert_eq!(out.rows, expected);
}

#[tokio::test]
async fn test_sliding_output_length() {
    let ctx = offline_ctx();
    for n in 0..6usize {
        for w in 1..5usize {
            let rows = id_rows(&(0..n as i64).collect::<Vec<_>>());
            let out = Sliding::new(values(rows), w, |win: &[Row]| Ok(win[0].clone()))
                .expect("window")
                .evaluate(&ctx)
                .await
                .expect("sliding");
            assert_eq!(out.len(), (n + 1).saturating_sub(w), "n={n} w={w}");
        }
    }
}

#[test]
fn test_sliding_rejects_zero_window() {
    let res = Sliding::new(values(vec![]), 0, |w: &[Row]| Ok(w[0].clone()));
    assert!(matches!(res, Err(Error::Plan(_))));
}

#[tokio::test]
async fn test_centered_mean_even_window_uses_later_middle() {
    let rows = vec![
        Row::new().with("d", "a").with("count", 1i64),
        Row::new().with("d", "b").with("count", 2i64),
        Row::new().with("d", "c").with("count", Scalar::Null),
    ];
    let out = Sliding::new(values(rows), 2, centered_mean("count"))
        .expect("window")
        .evaluate(&offline_ctx())
        .await
        .expect("sliding");

    assert_eq!(ids(&out, "d"), vec![text("b"), text("c")]);
    assert_eq!(ids(&out, "count"), vec![Scalar::F64(1.5), Scalar::F64(1.0)]);
}

#[tokio::test]
async fn test_division_is_pointwise() {
    let numerator = vec![
        Row::new().with("key", "x").with("count", 3i64),
        Row::new().with("key", "y").with("count", 7i64),
        Row::new().with("key", "z").with("count", 1i64),
        Row::new().with("key", "w").with("count", 4i64),
    ];
    let denominator = vec![
        Row::new().with("key", "x").with("count", 9i64),
        Row::new().with("key", "y").with("count", 0i64),
        Row::new().with("key", "w").with("count", 1i64),
        Row::new().with("key", "w").with("count", 8i64),
    ];
    let division = Division::new(values(numerator), values(denominator), "key", "count", "ratio");

    let out = division.evaluate(&offline_ctx()).await.expect("divide");
    assert_eq!(out.len(), 4);

    let x = &out.rows[0];
    assert_eq!(x.value("ratio"), &Scalar::F64(3.0 / 9.0));
    assert_eq!(x.value("total"), &Scalar::I64(9));
    assert_eq!(x.value("count"), &Scalar::I64(3));

    // Zero denominator and missing key are data, not failures.
    assert!(out.rows[1].value("ratio").as_f64().is_some_and(f64::is_nan));
    assert!(out.rows[2].value("ratio").as_f64().is_some_and(f64::is_nan));
    assert_eq!(out.rows[2].value("total"), &Scalar::Null);

    // Later denominator rows win on duplicate keys.
    assert_eq!(out.rows[3].value("ratio"), &Scalar::F64(0.5));
}

#[tokio::test]
async fn test_division_propagates_child_failure() {
    let failing: OperatorRef = Arc::new(CountingLeaf::new(vec![]).failing_first(1));
    let division = Division::new(values(id_rows(&[1])), failing, "id", "count", "ratio");

    let err = division.evaluate(&offline_ctx()).await.unwrap_err();
    assert!(matches!(err, Error::FetchFailed { status: Some(503), .. }));
}

#[tokio::test]
async fn test_shared_child_evaluated_once() {
    let leaf = CountingLeaf::new(vec![Row::new().with("key", "x").with("count", 4i64)]);
    let calls = leaf.calls.clone();
    let shared = Arc::new(Shared::new(Arc::new(leaf)));
    assert!(!shared.is_evaluated());

    let numerator = vec![Row::new().with("key", "x").with("count", 1i64)];
    let a = Division::new(values(numerator.clone()), shared.clone(), "key", "count", "ratio");
    let b = Division::new(values(numerator), shared.clone(), "key", "count", "ratio");

    let ctx = offline_ctx();
    let (ra, rb) = tokio::join!(a.evaluate(&ctx), b.evaluate(&ctx));
    assert_eq!(ra.expect("a"), rb.expect("b"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(shared.is_evaluated());

    shared.evaluate(&ctx).await.expect("again");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shared_does_not_cache_failures() {
    let leaf = CountingLeaf::new(id_rows(&[1])).failing_first(1);
    let calls = leaf.calls.clone();
    let shared = Shared::new(Arc::new(leaf));
    let ctx = offline_ctx();

    assert!(shared.evaluate(&ctx).await.is_err());
    assert!(!shared.is_evaluated());
    let out = shared.evaluate(&ctx).await.expect("retry");
    assert_eq!(out.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_render_plan_indents_children() {
    let sorted: OperatorRef = Arc::new(Sort::by_field(values(id_rows(&[1])), "id"));
    let division = Division::new(sorted, values(vec![]), "id", "count", "ratio");

    let plan = render_plan(&division);
    assert_eq!(
        plan,
        "division [key=id value=count -> ratio]\n  sort [by=id]\n    values [rows=1]\n  values [rows=0]\n"
    );
}
