//! Idle supervision and the single teardown routine.
//!
//! [`teardown`] is the only place services are stopped. It is reached from
//! a failed startup and from an interrupt while idle.

use std::time::Duration;

use futures::future::select_all;
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Supervisor;
use super::coordinator::Ready;
use super::service::{RunningService, ServiceState, TerminationOutcome};
use crate::error::{ShutdownFailure, TerminationError};

/// Record of one service that went through teardown.
#[derive(Debug, Clone)]
pub struct StoppedService {
    pub name: String,
    pub pid: u32,
    /// State just before the stop request.
    pub previous_state: ServiceState,
    pub outcome: TerminationOutcome,
    pub uptime: chrono::Duration,
}

/// Result of a teardown pass, in the order services were stopped.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub stopped: Vec<StoppedService>,
    /// Services that could not be stopped even by force.
    pub failures: Vec<TerminationError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn stopped_names(&self) -> Vec<&str> {
        self.stopped.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Stop every service, last-started first, one at a time.
///
/// Services are popped off the end of `services`, so the active set only
/// shrinks. A service whose force kill fails is dropped after its error is
/// recorded (`kill_on_drop` makes a last attempt).
pub async fn teardown(services: &mut Vec<RunningService>, grace: Duration) -> TeardownReport {
    let mut report = TeardownReport::default();

    while let Some(mut service) = services.pop() {
        let previous_state = service.state();
        match service.terminate(grace).await {
            Ok(outcome) => {
                tracing::info!(service = %service.name(), pid = service.pid(), %outcome, "Service stopped");
                report.stopped.push(StoppedService {
                    name: service.name().to_string(),
                    pid: service.pid(),
                    previous_state,
                    outcome,
                    uptime: service.uptime(),
                });
            }
            Err(e) => {
                tracing::error!(service = %service.name(), "Failed to stop service: {e}");
                report.failures.push(e);
            }
        }
    }

    report
}

/// Cancel `token` on Ctrl+C. The handler stays installed for the life of
/// the process, so later presses do not kill the supervisor mid-teardown.
pub fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    let interrupts = futures::stream::unfold((), |()| async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some(((), ())),
            Err(e) => {
                tracing::error!("Failed to listen for interrupt signal: {e}");
                None
            }
        }
    });
    tokio::spawn(relay_interrupts(token, interrupts))
}

/// Cancel `token` on the first item of `interrupts`; later items are only
/// logged. Returns when the stream ends.
pub async fn relay_interrupts(token: CancellationToken, interrupts: impl Stream<Item = ()>) {
    let mut interrupts = std::pin::pin!(interrupts);
    while interrupts.next().await.is_some() {
        if token.is_cancelled() {
            tracing::warn!("Already stopping services, waiting for teardown to finish");
        } else {
            tracing::info!("Interrupt received");
            token.cancel();
        }
    }
}

impl Supervisor {
    /// Hold the ready services until the cancellation token fires, then tear
    /// everything down in reverse startup order.
    ///
    /// While idle, children are watched without polling: a service that exits
    /// on its own is logged and marked failed, and the wait continues.
    pub async fn supervise(&self, ready: Ready) -> Result<TeardownReport, ShutdownFailure> {
        let mut services = ready.into_services();
        tracing::info!(services = services.len(), "All services healthy, waiting for interrupt");

        idle_until_cancelled(&mut services, &self.cancel).await;

        tracing::info!("Stopping services");
        let report = teardown(&mut services, self.grace).await;
        if report.is_clean() {
            Ok(report)
        } else {
            Err(ShutdownFailure { teardown: report })
        }
    }
}

async fn idle_until_cancelled(services: &mut [RunningService], cancel: &CancellationToken) {
    loop {
        let exited = {
            let watchers: Vec<_> = services
                .iter_mut()
                .enumerate()
                .filter(|(_, service)| service.is_live())
                .map(|(idx, service)| Box::pin(async move { (idx, service.wait_exit().await) }))
                .collect();

            if watchers.is_empty() {
                cancel.cancelled().await;
                None
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    ((idx, status), _, _) = select_all(watchers) => Some((idx, status)),
                }
            }
        };

        let Some((idx, status)) = exited else {
            return;
        };
        let service = &mut services[idx];
        match status {
            Ok(status) => {
                tracing::warn!(service = %service.name(), pid = service.pid(), %status, "Service exited unexpectedly");
            }
            Err(e) => {
                tracing::warn!(service = %service.name(), pid = service.pid(), "Lost track of service process: {e}");
            }
        }
        service.mark_failed();
    }
}
