//! HTTP probe client.
//!
//! Redirects are not followed: a chat app answering `302 -> /login` is up.

use std::time::{Duration, Instant};

use reqwest::{redirect, Client};
use serde::Serialize;
use tracing::debug;

use cs_core::config::ProbeConfig;
use cs_core::error::{CsResult, StackError};

/// Result of a single probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub url: String,
    /// HTTP status, if the server answered at all.
    pub status: Option<u16>,
    pub latency_ms: u128,
    /// Transport error (connection refused, timeout, ...).
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// The endpoint answered with a 2xx or 3xx status.
    pub fn is_ready(&self) -> bool {
        matches!(self.status, Some(code) if (200..400).contains(&code))
    }

    /// Short human description: `200 (12ms)`, `503`, `connection refused`.
    pub fn summary(&self) -> String {
        match (self.status, &self.error) {
            (Some(code), _) if self.is_ready() => format!("{code} ({}ms)", self.latency_ms),
            (Some(code), _) => code.to_string(),
            (None, Some(err)) => err.clone(),
            (None, None) => "no response".to_string(),
        }
    }
}

/// Thin reqwest wrapper used for readiness checks.
#[derive(Clone)]
pub struct ProbeClient {
    inner: Client,
    timeout: Duration,
}

impl ProbeClient {
    /// Create a client from probe configuration.
    pub fn new(config: &ProbeConfig) -> CsResult<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let inner = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| StackError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { inner, timeout })
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one GET and record what happened. Never fails; transport
    /// errors are part of the outcome.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        let result = self.inner.get(url).send().await;
        let latency_ms = start.elapsed().as_millis();

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!("probe {url} -> {status} in {latency_ms}ms");
                ProbeOutcome {
                    url: url.to_string(),
                    status: Some(status),
                    latency_ms,
                    error: None,
                }
            }
            Err(e) => {
                let error = classify_error(&e);
                debug!("probe {url} failed: {error}");
                ProbeOutcome {
                    url: url.to_string(),
                    status: None,
                    latency_ms,
                    error: Some(error),
                }
            }
        }
    }
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: Option<u16>, error: Option<&str>) -> ProbeOutcome {
        ProbeOutcome {
            url: "http://localhost:3000/".into(),
            status,
            latency_ms: 7,
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_readiness_by_status() {
        assert!(outcome(Some(200), None).is_ready());
        assert!(outcome(Some(302), None).is_ready());
        assert!(!outcome(Some(404), None).is_ready());
        assert!(!outcome(Some(502), None).is_ready());
        assert!(!outcome(None, Some("connection refused")).is_ready());
    }

    #[test]
    fn test_summary() {
        assert_eq!(outcome(Some(200), None).summary(), "200 (7ms)");
        assert_eq!(outcome(Some(503), None).summary(), "503");
        assert_eq!(outcome(None, Some("timed out")).summary(), "timed out");
    }
}
