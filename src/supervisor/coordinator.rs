//! Startup coordinator: launch everything, then probe everything, in
//! registry order. All-or-nothing.

use std::sync::Arc;

use super::Supervisor;
use super::launcher::launch;
use super::lifecycle::teardown;
use super::prober::wait_healthy;
use super::service::RunningService;
use crate::error::{ProbeError, StartupCause, StartupFailure, StartupStage};
use crate::registry::Registry;

/// Lines of captured output attached to a startup failure.
pub const FAILURE_OUTPUT_LINES: usize = 20;

/// Every service launched and healthy, in registry order.
#[derive(Debug)]
pub struct Ready {
    services: Vec<RunningService>,
}

impl Ready {
    pub fn services(&self) -> &[RunningService] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn into_services(self) -> Vec<RunningService> {
        self.services
    }
}

impl Supervisor {
    /// Launch every service in registry order, then wait for each to become
    /// healthy in the same order.
    ///
    /// On the first launch failure, probe failure, or interrupt, every process
    /// launched so far is stopped (reverse order) before the failure is
    /// returned. Services after a failed launch are never started.
    pub async fn start_all(&self, registry: &Registry) -> Result<Ready, StartupFailure> {
        let mut launched: Vec<RunningService> = Vec::with_capacity(registry.len());

        for spec in registry.iter() {
            if self.cancel.is_cancelled() {
                let cause = ProbeError::Interrupted {
                    service: spec.name.clone(),
                };
                return Err(self
                    .abort(launched, StartupStage::Interrupted, cause.into(), Vec::new())
                    .await);
            }

            match launch(Arc::clone(spec)) {
                Ok(service) => launched.push(service),
                Err(e) => {
                    return Err(self
                        .abort(launched, StartupStage::Launch, e.into(), Vec::new())
                        .await);
                }
            }
        }

        tracing::info!("Waiting for services to start...");

        for idx in 0..launched.len() {
            if let Err(e) = wait_healthy(&self.client, &mut launched[idx], &self.probe, &self.cancel).await {
                let stage = match e {
                    ProbeError::Interrupted { .. } => StartupStage::Interrupted,
                    ProbeError::HealthTimeout { .. } | ProbeError::PrematureExit { .. } => {
                        StartupStage::Health
                    }
                };
                let recent_output = launched[idx].output().tail(FAILURE_OUTPUT_LINES);
                return Err(self.abort(launched, stage, e.into(), recent_output).await);
            }
        }

        Ok(Ready { services: launched })
    }

    async fn abort(
        &self,
        mut launched: Vec<RunningService>,
        stage: StartupStage,
        cause: StartupCause,
        recent_output: Vec<String>,
    ) -> StartupFailure {
        let service = match &cause {
            StartupCause::Launch(e) => e.service().to_string(),
            StartupCause::Probe(e) => e.service().to_string(),
        };
        tracing::error!(service = %service, %stage, "{cause}");
        tracing::info!(launched = launched.len(), "Stopping already started services");

        let teardown = teardown(&mut launched, self.grace).await;
        StartupFailure {
            stage,
            service,
            cause,
            recent_output,
            teardown,
        }
    }
}
