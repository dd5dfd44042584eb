//! A launched service and the OS process it owns.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::Child;

use super::output::OutputBuffer;
use crate::error::TerminationError;
use crate::registry::ServiceSpec;

/// How long to wait for the kernel to hand back a SIGKILLed process.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a [`RunningService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Launched, not yet seen healthy.
    Starting,
    /// Health endpoint returned 200.
    Healthy,
    /// Timed out unhealthy, or exited on its own.
    Failed,
    /// Stopped by the supervisor and reaped.
    Terminated,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceState::Starting => "starting",
            ServiceState::Healthy => "healthy",
            ServiceState::Failed => "failed",
            ServiceState::Terminated => "terminated",
        })
    }
}

/// How a call to [`RunningService::terminate`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// An earlier call already stopped the process; nothing was done.
    AlreadyTerminated,
    /// The process had exited before the stop request; only its leftover
    /// process group was killed.
    AlreadyExited,
    /// Exited within the grace period after SIGTERM.
    Graceful,
    /// Needed SIGKILL.
    Forced,
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TerminationOutcome::AlreadyTerminated => "already terminated",
            TerminationOutcome::AlreadyExited => "had already exited",
            TerminationOutcome::Graceful => "stopped",
            TerminationOutcome::Forced => "killed after grace period",
        })
    }
}

/// One started service. Owns its child process exclusively; the process is
/// the leader of its own process group, so signals reach its descendants too.
#[derive(Debug)]
pub struct RunningService {
    spec: Arc<ServiceSpec>,
    child: Child,
    pid: u32,
    state: ServiceState,
    launched_at: DateTime<Utc>,
    output: OutputBuffer,
    exit_status: Option<ExitStatus>,
}

impl RunningService {
    pub(crate) fn new(spec: Arc<ServiceSpec>, child: Child, pid: u32, output: OutputBuffer) -> Self {
        Self {
            spec,
            child,
            pid,
            state: ServiceState::Starting,
            launched_at: Utc::now(),
            output,
            exit_status: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn launched_at(&self) -> DateTime<Utc> {
        self.launched_at
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.launched_at
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    /// Exit status once the process has been reaped.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Still expected to have a live process behind it.
    pub fn is_live(&self) -> bool {
        matches!(self.state, ServiceState::Starting | ServiceState::Healthy)
            && self.exit_status.is_none()
    }

    pub(crate) fn mark_healthy(&mut self) {
        if self.state == ServiceState::Starting {
            self.state = ServiceState::Healthy;
        }
    }

    pub(crate) fn mark_failed(&mut self) {
        if self.state != ServiceState::Terminated {
            self.state = ServiceState::Failed;
        }
    }

    /// Non-blocking check for an exit the supervisor did not ask for.
    pub fn poll_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        if let Some(status) = self.exit_status {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?;
        self.exit_status = status;
        Ok(status)
    }

    /// Wait until the process exits on its own. Cancel-safe.
    pub async fn wait_exit(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Stop the process: SIGTERM to its group, wait up to `grace`, then
    /// SIGKILL. Idempotent: once terminated, further calls do nothing and
    /// return [`TerminationOutcome::AlreadyTerminated`].
    pub async fn terminate(&mut self, grace: Duration) -> Result<TerminationOutcome, TerminationError> {
        if self.state == ServiceState::Terminated {
            return Ok(TerminationOutcome::AlreadyTerminated);
        }

        if let Ok(Some(_)) = self.poll_exit() {
            // The leader is gone but whatever it started may still hold the group.
            self.sweep_group();
            self.state = ServiceState::Terminated;
            return Ok(TerminationOutcome::AlreadyExited);
        }

        tracing::debug!(service = %self.spec.name, pid = self.pid, "Sending SIGTERM");
        if let Err(errno) = killpg(self.group(), Signal::SIGTERM) {
            tracing::debug!(service = %self.spec.name, pid = self.pid, "SIGTERM not delivered: {errno}");
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit_status = Some(status);
                // Descendants that ignored SIGTERM.
                self.sweep_group();
                self.state = ServiceState::Terminated;
                Ok(TerminationOutcome::Graceful)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    service = %self.spec.name,
                    pid = self.pid,
                    "Wait after SIGTERM failed ({e}), sending SIGKILL"
                );
                self.force_kill().await?;
                Ok(TerminationOutcome::Forced)
            }
            Err(_) => {
                tracing::warn!(
                    service = %self.spec.name,
                    pid = self.pid,
                    grace_secs = grace.as_secs_f64(),
                    "Did not exit within grace period, sending SIGKILL"
                );
                self.force_kill().await?;
                Ok(TerminationOutcome::Forced)
            }
        }
    }

    async fn force_kill(&mut self) -> Result<(), TerminationError> {
        match killpg(self.group(), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(errno) => {
                tracing::warn!(service = %self.spec.name, "killpg failed ({errno}), killing leader only");
                self.child
                    .start_kill()
                    .map_err(|source| TerminationError::ForceKill {
                        service: self.spec.name.clone(),
                        pid: self.pid,
                        source,
                    })?;
            }
        }

        match tokio::time::timeout(KILL_REAP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit_status = Some(status);
                self.state = ServiceState::Terminated;
                Ok(())
            }
            Ok(Err(source)) => Err(TerminationError::Reap {
                service: self.spec.name.clone(),
                pid: self.pid,
                source,
            }),
            Err(_) => Err(TerminationError::Unreaped {
                service: self.spec.name.clone(),
                pid: self.pid,
            }),
        }
    }

    /// SIGKILL whatever is left in the process group. A group that no longer
    /// exists (ESRCH) is the normal case.
    fn sweep_group(&self) {
        match killpg(self.group(), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(errno) => {
                tracing::debug!(
                    service = %self.spec.name,
                    pid = self.pid,
                    "Process group sweep failed: {errno}"
                );
            }
        }
    }

    fn group(&self) -> Pid {
        Pid::from_raw(self.pid as i32)
    }
}
