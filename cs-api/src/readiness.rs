//! Readiness polling for the stack's endpoints.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info};

use cs_core::config::ProbeConfig;
use cs_core::error::{CsResult, StackError};
use cs_models::Endpoint;

use crate::client::{ProbeClient, ProbeOutcome};

/// Polling schedule for `wait_until_ready`.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first miss (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Give up once this much time has passed.
    pub deadline: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for BackoffConfig {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            deadline: Duration::from_secs(config.max_wait_secs),
        }
    }
}

impl BackoffConfig {
    /// Delay before attempt `attempt + 1`, with exponential backoff.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(20));
        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }
}

/// Probe result for one named endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport {
    pub endpoint: Endpoint,
    pub outcome: ProbeOutcome,
}

impl ProbeClient {
    /// Poll `url` until it is ready or the deadline passes.
    ///
    /// `on_miss` is called after every unsuccessful attempt with the attempt
    /// number (1-based) and its outcome, so callers can update a spinner.
    pub async fn wait_until_ready<F>(
        &self,
        url: &str,
        backoff: &BackoffConfig,
        mut on_miss: F,
    ) -> CsResult<ProbeOutcome>
    where
        F: FnMut(u32, &ProbeOutcome),
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let outcome = self.probe(url).await;
            if outcome.is_ready() {
                info!("{url} ready after {:.1}s", start.elapsed().as_secs_f64());
                return Ok(outcome);
            }

            attempt += 1;
            on_miss(attempt, &outcome);

            let remaining = backoff.deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(StackError::Timeout(format!(
                    "{url} not ready after {}s (last: {})",
                    backoff.deadline.as_secs(),
                    outcome.summary()
                )));
            }
            // The last sleep is cut short so one attempt lands on the deadline.
            let delay = backoff.delay_for(attempt - 1).min(remaining);
            debug!("{url} not ready ({}), retrying in {:?}", outcome.summary(), delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Probe every endpoint concurrently. Reports keep the input order.
    pub async fn check_all(&self, endpoints: &[Endpoint]) -> Vec<EndpointReport> {
        let mut set = JoinSet::new();
        for (idx, endpoint) in endpoints.iter().cloned().enumerate() {
            let client = self.clone();
            set.spawn(async move {
                let outcome = client.probe(&endpoint.url).await;
                (idx, EndpointReport { endpoint, outcome })
            });
        }

        let mut reports: Vec<(usize, EndpointReport)> = Vec::with_capacity(endpoints.len());
        while let Some(joined) = set.join_next().await {
            if let Ok(entry) = joined {
                reports.push(entry);
            }
        }
        reports.sort_by_key(|(idx, _)| *idx);
        reports.into_iter().map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_models::ServiceRole;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `status` to every connection until the test ends.
    async fn serve(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/")
    }

    /// A URL nothing is listening on.
    async fn closed_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/")
    }

    fn fast_backoff(deadline_ms: u64) -> BackoffConfig {
        BackoffConfig {
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(50),
            deadline: Duration::from_millis(deadline_ms),
        }
    }

    fn client() -> ProbeClient {
        ProbeClient::new(&ProbeConfig { timeout_ms: 500, ..ProbeConfig::default() }).unwrap()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = BackoffConfig {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            deadline: Duration::from_secs(60),
        };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(5));
        assert_eq!(backoff.delay_for(63), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_live_endpoint_is_ready() {
        let url = serve("200 OK").await;
        let mut misses = 0;
        let outcome = client()
            .wait_until_ready(&url, &fast_backoff(2_000), |_, _| misses += 1)
            .await
            .unwrap();
        assert_eq!(outcome.status, Some(200));
        assert_eq!(misses, 0);
    }

    #[tokio::test]
    async fn test_redirect_counts_as_ready() {
        let url = serve("302 Found").await;
        let outcome = client().probe(&url).await;
        assert!(outcome.is_ready());
    }

    #[tokio::test]
    async fn test_closed_port_times_out() {
        let url = closed_url().await;
        let mut misses = 0;
        let err = client()
            .wait_until_ready(&url, &fast_backoff(200), |_, _| misses += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::Timeout(_)), "{err}");
        assert!(misses >= 1);
    }

    #[tokio::test]
    async fn test_last_attempt_lands_on_deadline() {
        let url = closed_url().await;
        let backoff = BackoffConfig {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5),
            deadline: Duration::from_millis(300),
        };
        let start = Instant::now();
        let mut misses = 0;
        let err = client()
            .wait_until_ready(&url, &backoff, |_, _| misses += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::Timeout(_)), "{err}");
        assert_eq!(misses, 2);
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_server_error_is_not_ready() {
        let url = serve("503 Service Unavailable").await;
        let err = client()
            .wait_until_ready(&url, &fast_backoff(150), |_, _| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"), "{err}");
    }

    #[tokio::test]
    async fn test_check_all_keeps_order() {
        let up = serve("200 OK").await;
        let down = closed_url().await;
        let endpoints = vec![
            Endpoint { name: "a".into(), service: "chat".into(), role: ServiceRole::Chat, url: down },
            Endpoint { name: "b".into(), service: "identity".into(), role: ServiceRole::Identity, url: up },
        ];
        let reports = client().check_all(&endpoints).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].endpoint.name, "a");
        assert!(!reports[0].outcome.is_ready());
        assert!(reports[1].outcome.is_ready());
    }
}
