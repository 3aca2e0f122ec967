//! Evaluation context handed down the operator tree.

use tokio_util::sync::CancellationToken;

/// Everything a leaf needs to talk to the aggregate endpoint, plus the
/// cancellation signal shared by the whole query.
///
/// Cloning is cheap: the HTTP client and the token are both reference counted.
#[derive(Debug, Clone)]
pub struct EvalContext {
    lapis: String,
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl EvalContext {
    pub fn new(lapis: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            lapis: lapis.into().trim_end_matches('/').to_string(),
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned token; cancelling it aborts every in-flight fetch.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Endpoint base URL without a trailing slash.
    pub fn lapis(&self) -> &str {
        &self.lapis
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
