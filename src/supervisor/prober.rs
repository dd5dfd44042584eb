//! Health prober.
//!
//! Polls a service's health URL until it answers 200 or the service's
//! timeout runs out. Every other outcome (connection refused, non-200,
//! per-attempt timeout) counts as "not ready yet" and is retried after the
//! polling interval.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::service::RunningService;
use crate::error::ProbeError;

/// Polling cadence shared by all services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Wait between attempts.
    pub interval: Duration,
    /// Network timeout for a single GET.
    pub attempt_timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// Build the HTTP client used for health checks. Proxies are disabled:
/// health URLs point at local services.
pub fn health_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().no_proxy().build()
}

/// Poll until `service` is healthy. Returns the number of attempts made.
///
/// Bounded: returns no later than the service's timeout plus one interval.
/// In practice attempts and waits are clamped to the remaining budget.
pub async fn wait_healthy(
    client: &reqwest::Client,
    service: &mut RunningService,
    policy: &ProbePolicy,
    cancel: &CancellationToken,
) -> Result<u32, ProbeError> {
    let name = service.name().to_string();
    let url = service.spec().health_url.clone();
    let timeout = service.spec().timeout;
    let deadline = Instant::now() + timeout;
    let mut attempts: u32 = 0;

    tracing::info!(service = %name, url = %url, "Checking service");

    loop {
        match service.poll_exit() {
            Ok(Some(status)) => {
                service.mark_failed();
                return Err(ProbeError::PrematureExit {
                    service: name,
                    status: status.to_string(),
                });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(service = %name, "Could not query process status: {e}"),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        attempts += 1;
        let healthy = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ProbeError::Interrupted { service: name });
            }
            healthy = check_once(client, &url, policy.attempt_timeout.min(remaining)) => healthy,
        };
        if healthy {
            service.mark_healthy();
            tracing::info!(service = %name, attempts, "✓ {name} is running");
            return Ok(attempts);
        }
        tracing::debug!(service = %name, attempt = attempts, "Not ready yet");

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ProbeError::Interrupted { service: name });
            }
            _ = tokio::time::sleep(policy.interval.min(remaining)) => {}
        }
    }

    service.mark_failed();
    tracing::warn!(service = %name, attempts, "✗ {name} failed to start within {} seconds", timeout.as_secs_f64());
    Err(ProbeError::HealthTimeout {
        service: name,
        timeout,
    })
}

/// One GET. True only for status 200; connection errors, other statuses and
/// timeouts are all "not ready".
pub async fn check_once(client: &reqwest::Client, url: &Url, attempt_timeout: Duration) -> bool {
    match client.get(url.clone()).timeout(attempt_timeout).send().await {
        Ok(resp) if resp.status() == StatusCode::OK => true,
        Ok(resp) => {
            tracing::debug!(url = %url, status = %resp.status(), "Health check returned non-200");
            false
        }
        Err(e) => {
            tracing::debug!(url = %url, "Health check failed: {e}");
            false
        }
    }
}
