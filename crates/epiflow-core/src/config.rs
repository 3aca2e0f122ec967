//! Client configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the aggregate query endpoint (no trailing slash needed).
    pub lapis_url: String,

    /// Transport timeout. `None` leaves deadlines to the caller's cancellation token.
    pub timeout_ms: Option<u64>,

    /// Sent as the `User-Agent` header on every fetch.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            lapis_url: "http://localhost:8090".to_string(),
            timeout_ms: None,
            user_agent: concat!("epiflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EPIFLOW_LAPIS_URL`: endpoint base URL
    /// - `EPIFLOW_HTTP_TIMEOUT_MS`: transport timeout in milliseconds
    /// - `EPIFLOW_USER_AGENT`: user agent header
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("EPIFLOW_LAPIS_URL") {
            cfg.lapis_url = s;
        }

        if let Ok(s) = std::env::var("EPIFLOW_HTTP_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.timeout_ms = Some(v);
            }
        }

        if let Ok(s) = std::env::var("EPIFLOW_USER_AGENT") {
            cfg.user_agent = s;
        }

        cfg
    }

    /// Endpoint URL with any trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.lapis_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "lapis url must be http(s), got '{}'",
                self.lapis_url
            )));
        }
        Ok(())
    }
}
