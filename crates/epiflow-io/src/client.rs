//! HTTP client construction from `ClientConfig`.

use std::time::Duration;

use epiflow_core::config::ClientConfig;
use epiflow_core::{Error, Result};
use epiflow_operators::EvalContext;
use reqwest::Client;

pub fn build_client(cfg: &ClientConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(cfg.user_agent.clone());
    if let Some(ms) = cfg.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Validate `cfg` and build a fresh evaluation context (with its own
/// cancellation token) pointing at the configured endpoint.
pub fn context_from_config(cfg: &ClientConfig) -> Result<EvalContext> {
    cfg.validate()?;
    Ok(EvalContext::new(cfg.base_url(), build_client(cfg)?))
}
