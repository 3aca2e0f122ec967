//! Helpers shared by the integration tests: rows, contexts, counting leaves
//! and an in-process stand-in for the aggregate endpoint.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use epiflow_core::{Dataset, Error, Result, Row, Scalar};
use epiflow_operators::{EvalContext, Operator};
use serde_json::Value;

/// Context for pipelines that never reach the network.
pub fn offline_ctx() -> EvalContext {
    EvalContext::new("http://127.0.0.1:9", reqwest::Client::new())
}

pub fn ctx_for(base_url: &str) -> EvalContext {
    EvalContext::new(base_url, reqwest::Client::new())
}

/// `{date, count}` row as the fetch leaf produces it.
pub fn daily(date: Option<&str>, count: i64) -> Row {
    Row::new().with("date", date).with("count", count)
}

pub fn ids(data: &Dataset, field: &str) -> Vec<Scalar> {
    data.column(field).cloned().collect()
}

/// In-memory leaf that counts its evaluations and can fail the first `fail_first` of them.
pub struct CountingLeaf {
    rows: Vec<Row>,
    pub calls: Arc<AtomicUsize>,
    fail_first: usize,
}

impl CountingLeaf {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first: 0,
        }
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }
}

#[async_trait]
impl Operator for CountingLeaf {
    fn name(&self) -> &'static str {
        "counting_leaf"
    }

    async fn evaluate(&self, _ctx: &EvalContext) -> Result<Dataset> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(Error::FetchFailed {
                status: Some(503),
                problem: None,
                message: "unavailable".into(),
            });
        }
        // Yield once so concurrent callers actually overlap.
        tokio::task::yield_now().await;
        Ok(Dataset::new(self.rows.clone()))
    }
}

/// Requests received by a mock endpoint, as JSON bodies.
pub type RequestLog = Arc<Mutex<Vec<Value>>>;

/// Serve `respond` at `{base}/sample/aggregated` on an ephemeral port.
/// Returns the base URL and the log of received request bodies.
pub async fn spawn_lapis<F>(respond: F) -> (String, RequestLog)
where
    F: Fn(&Value) -> (StatusCode, Value) + Send + Sync + 'static,
{
    spawn_lapis_delayed(std::time::Duration::ZERO, respond).await
}

pub async fn spawn_lapis_delayed<F>(delay: std::time::Duration, respond: F) -> (String, RequestLog)
where
    F: Fn(&Value) -> (StatusCode, Value) + Send + Sync + 'static,
{
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);
    let requests = log.clone();

    let app = Router::new().route(
        "/sample/aggregated",
        post(move |Json(body): Json<Value>| {
            let requests = requests.clone();
            let respond = respond.clone();
            async move {
                requests.lock().expect("request log").push(body.clone());
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let (status, json) = respond(&body);
                (status, Json(json))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock endpoint");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock endpoint");
    });
    (format!("http://{addr}"), log)
}

/// `{ "data": rows }` with each row `{date, count}`.
pub fn aggregated(rows: &[(Option<&str>, i64)]) -> Value {
    let data: Vec<Value> = rows
        .iter()
        .map(|(date, count)| serde_json::json!({ "date": date, "count": count }))
        .collect();
    serde_json::json!({ "data": data })
}
