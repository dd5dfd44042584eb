//! Service supervision subsystem.
//!
//! [`launcher`] spawns processes, [`prober`] waits for health, [`coordinator`]
//! runs the all-or-nothing startup, and [`lifecycle`] holds the ready set until
//! interrupt and owns the one teardown routine used by every stop path.
//!
//! **Cancellation model:** a single [`CancellationToken`] (cancelled on Ctrl+C)
//! is honored while probing and while idle. Teardown itself is never cancelled.

pub mod coordinator;
pub mod launcher;
pub mod lifecycle;
pub mod output;
pub mod prober;
pub mod service;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
pub use coordinator::Ready;
pub use lifecycle::{StoppedService, TeardownReport};
pub use prober::ProbePolicy;
pub use service::{RunningService, ServiceState, TerminationOutcome};

/// Drives startup and shutdown. Owns the active service set for the whole run.
#[derive(Debug, Clone)]
pub struct Supervisor {
    client: reqwest::Client,
    probe: ProbePolicy,
    grace: Duration,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Build a supervisor from the resolved application configuration.
    pub fn new(config: &AppConfig, cancel: CancellationToken) -> anyhow::Result<Self> {
        let probe = ProbePolicy {
            interval: Duration::from_secs(config.probe_interval_secs),
            attempt_timeout: Duration::from_secs(config.probe_attempt_timeout_secs),
        };
        Self::with_policy(probe, Duration::from_secs(config.grace_period_secs), cancel)
    }

    pub fn with_policy(
        probe: ProbePolicy,
        grace: Duration,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !probe.interval.is_zero() && !probe.attempt_timeout.is_zero(),
            "Health-check interval and attempt timeout must be non-zero"
        );
        let client = prober::health_client()
            .map_err(|e| anyhow::anyhow!("Failed to build health-check client: {}", e))?;
        Ok(Self {
            client,
            probe,
            grace,
            cancel,
        })
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn grace_period(&self) -> Duration {
        self.grace
    }
}
